//! Embedding service abstraction
//!
//! Provides a unified interface for the embedding providers DocHub knows:
//! - Ollama (local model server, default: nomic-embed-text)
//! - OpenAI (text-embedding-3-small and friends)
//! - Mock (tests)
//!
//! Every provider validates the returned dimension against its configured
//! dimension; a mismatch is a fatal configuration error and is never retried.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Retry policy shared by the HTTP-backed providers
fn retry_policy(timeout_secs: u64, max_retries: u32) -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_multiplier(2.0)
        .with_max_interval(Duration::from_secs(30))
        .with_max_elapsed_time(Some(Duration::from_secs(
            timeout_secs * (max_retries as u64 + 1),
        )))
        .build()
}

/// Classify an error for the retry loop: transient failures back off,
/// everything else (validation, dimension mismatch) is permanent.
fn classify(err: AppError) -> backoff::Error<AppError> {
    if err.is_transient() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama embedding client (local model server)
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_ms: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: Option<String>,
        model: String,
        dimension: usize,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
            dimension,
            timeout_ms: timeout_secs * 1000,
            max_retries,
        }
    }

    async fn make_request(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::EmbeddingTimeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AppError::EmbeddingError {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OllamaResponse =
            response.json().await.map_err(|e| AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })?;

        if result.embedding.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: result.embedding.len(),
            });
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let policy = retry_policy(self.timeout_ms / 1000, self.max_retries);

        backoff::future::retry(policy, || async {
            self.make_request(text).await.map_err(|e| {
                if e.is_transient() {
                    tracing::warn!(error = %e, model = %self.model, "Embedding request failed, retrying");
                }
                classify(e)
            })
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// OpenAI
// ============================================================================

/// OpenAI embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_ms: u64,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAiRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        dimension: usize,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model,
            dimension,
            timeout_ms: timeout_secs * 1000,
            max_retries,
        }
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAiRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::EmbeddingTimeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AppError::EmbeddingError {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::UpstreamRateLimited {
                    message: format!("Embedding API rate limited: {}", body),
                });
            }
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: OpenAiResponse =
            response.json().await.map_err(|e| AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let embeddings: Vec<Vec<f32>> = result.data.into_iter().map(|e| e.embedding).collect();

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(AppError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingError {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let policy = retry_policy(self.timeout_ms / 1000, self.max_retries);

        backoff::future::retry(policy, || async {
            self.make_request(texts).await.map_err(classify)
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock embedder for testing: deterministic vectors derived from the text
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // Simple seeded generator so identical text yields identical vectors
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for b in text.bytes() {
            state ^= b as u64;
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }

        Ok((0..self.dimension)
            .map(|i| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(i as u64);
                ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create an embedder from configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            config.api_base.clone(),
            config.model.clone(),
            config.dimension,
            config.timeout_secs,
            config.max_retries,
        ))),
        "openai" => {
            let key = config
                .api_key
                .clone()
                .ok_or_else(|| AppError::Configuration {
                    message: "OpenAI embedding provider requires an API key".to_string(),
                })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                key,
                config.api_base.clone(),
                config.model.clone(),
                config.dimension,
                config.timeout_secs,
                config.max_retries,
            )))
        }
        "mock" => Ok(Arc::new(MockEmbedder::new(config.dimension))),
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_dimension() {
        let embedder = MockEmbedder::new(768);
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("same input").await.unwrap();
        let b = embedder.embed("same input").await.unwrap();
        let c = embedder.embed("different input").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_mock_batch_preserves_order() {
        let embedder = MockEmbedder::new(32);
        let texts = vec!["one".to_string(), "two".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], embedder.embed("one").await.unwrap());
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "wordvec2000".to_string(),
            api_key: None,
            api_base: None,
            model: "m".to_string(),
            dimension: 8,
            timeout_secs: 1,
            max_retries: 0,
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_factory_requires_openai_key() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            api_key: None,
            api_base: None,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_secs: 1,
            max_retries: 0,
        };
        assert!(create_embedder(&config).is_err());
    }
}
