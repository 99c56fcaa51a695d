//! Language-model capability with a closed provider set
//!
//! Providers are selected by configuration, not inheritance:
//! - Ollama (local model server, default)
//! - OpenAI (cloud)
//! - Mock (tests)
//!
//! Network failures are retried with bounded exponential backoff; API
//! errors (bad key, unknown model) are surfaced immediately.

use backoff::ExponentialBackoffBuilder;
use dochub_common::config::ChatConfig;
use dochub_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Trait for grounded text generation
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply from the system instruction, retrieved context and
    /// user content
    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
        user_content: &str,
    ) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn retry_policy(timeout_secs: u64, max_retries: u32) -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(2))
        .with_multiplier(2.0)
        .with_max_interval(Duration::from_secs(30))
        .with_max_elapsed_time(Some(Duration::from_secs(
            timeout_secs * (max_retries as u64 + 1),
        )))
        .build()
}

/// Build the three-part message list shared by the chat APIs
fn build_messages(system_prompt: &str, context: &str, user_content: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        },
        ChatMessage {
            role: "system".to_string(),
            content: format!("Context from documentation:\n\n{}", context),
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_content.to_string(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama chat client (local model server)
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

impl OllamaGenerator {
    pub fn new(config: &ChatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }

    async fn make_request(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::CompletionError {
                message: format!("Ollama request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CompletionError {
                message: format!("Ollama API error {}: {}", status, body),
            });
        }

        let result: OllamaChatResponse =
            response.json().await.map_err(|e| AppError::CompletionError {
                message: format!("Failed to parse Ollama response: {}", e),
            })?;

        Ok(result.message.content)
    }
}

#[async_trait::async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
        user_content: &str,
    ) -> Result<String> {
        let messages = build_messages(system_prompt, context, user_content);
        let policy = retry_policy(self.timeout_secs, self.max_retries);

        backoff::future::retry(policy, || async {
            self.make_request(&messages).await.map_err(|e| {
                if e.is_transient() {
                    tracing::warn!(error = %e, model = %self.model, "Completion failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI
// ============================================================================

/// OpenAI chat client
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, config: &ChatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }

    async fn make_request(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = OpenAiChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::CompletionError {
                message: format!("OpenAI request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::UpstreamRateLimited {
                    message: format!("OpenAI rate limited: {}", body),
                });
            }
            return Err(AppError::CompletionError {
                message: format!("OpenAI API error {}: {}", status, body),
            });
        }

        let result: OpenAiChatResponse =
            response.json().await.map_err(|e| AppError::CompletionError {
                message: format!("Failed to parse OpenAI response: {}", e),
            })?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::CompletionError {
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait::async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
        user_content: &str,
    ) -> Result<String> {
        let messages = build_messages(system_prompt, context, user_content);
        let policy = retry_policy(self.timeout_secs, self.max_retries);

        backoff::future::retry(policy, || async {
            self.make_request(&messages).await.map_err(|e| {
                if matches!(e, AppError::UpstreamRateLimited { .. }) || e.is_transient() {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock generator for testing: fixed reply or forced failure, recording the
/// prompts it was given
pub struct MockGenerator {
    reply: Option<String>,
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl MockGenerator {
    /// Always reply with the given text
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with a completion error
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
        user_content: &str,
    ) -> Result<String> {
        self.calls.lock().await.push((
            system_prompt.to_string(),
            context.to_string(),
            user_content.to_string(),
        ));

        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(AppError::CompletionError {
                message: "mock generator failure".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The closed set of providers available to conversations.
///
/// Built from configuration at startup: the local Ollama server is always
/// registered, OpenAI only when a key is configured.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Generator>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &ChatConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn Generator>> = HashMap::new();

        providers.insert(
            "ollama".to_string(),
            Arc::new(OllamaGenerator::new(config)),
        );

        if let Some(ref key) = config.api_key {
            providers.insert(
                "openai".to_string(),
                Arc::new(OpenAiGenerator::new(key.clone(), config)),
            );
        }

        Self { providers }
    }

    /// Empty registry for tests
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under a name (used by tests to inject mocks)
    pub fn register(&mut self, name: &str, generator: Arc<dyn Generator>) {
        self.providers.insert(name.to_string(), generator);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_replies() {
        let generator = MockGenerator::replying("the answer");
        let reply = generator.generate("system", "context", "question").await.unwrap();
        assert_eq!(reply, "the answer");

        let calls = generator.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, "question");
    }

    #[tokio::test]
    async fn test_mock_generator_failure() {
        let generator = MockGenerator::failing();
        let err = generator.generate("s", "c", "q").await.unwrap_err();
        assert!(matches!(err, AppError::CompletionError { .. }));
    }

    #[test]
    fn test_registry_from_config_registers_ollama() {
        let config = ChatConfig {
            provider: "ollama".to_string(),
            api_key: None,
            api_base: None,
            model: "llama3.1".to_string(),
            timeout_secs: 1,
            max_retries: 0,
            max_tokens: 100,
            temperature: 0.7,
            top_k: 5,
            title_max_chars: 50,
            degrade_on_search_failure: true,
        };

        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.contains("ollama"));
        assert!(!registry.contains("openai"));
    }

    #[test]
    fn test_registry_registers_openai_with_key() {
        let config = ChatConfig {
            provider: "openai".to_string(),
            api_key: Some("sk-test".to_string()),
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 1,
            max_retries: 0,
            max_tokens: 100,
            temperature: 0.7,
            top_k: 5,
            title_max_chars: 50,
            degrade_on_search_failure: true,
        };

        let registry = ProviderRegistry::from_config(&config);
        assert!(registry.contains("openai"));
    }

    #[test]
    fn test_build_messages_shape() {
        let messages = build_messages("sys", "ctx", "hello");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("ctx"));
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "hello");
    }
}
