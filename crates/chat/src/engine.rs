//! Conversation / RAG orchestration
//!
//! Drives the message workflow: persist the user message first, retrieve
//! grounding context, generate a reply, persist the assistant message with
//! citations. Sends to one conversation are serialized; different
//! conversations proceed in parallel.

use crate::context::{assemble_context, build_citations, derive_title};
use crate::prompt::{GROUNDED_SYSTEM_PROMPT, NO_CONTEXT_REPLY};
use crate::providers::ProviderRegistry;
use dochub_common::config::ChatConfig;
use dochub_common::db::models::{Conversation, Message, MessageRole};
use dochub_common::db::Repository;
use dochub_common::errors::{AppError, Result};
use dochub_common::metrics;
use dochub_search::{SearchResultItem, SearchService};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Target of a send: an existing conversation, or a lazily created one
#[derive(Debug, Clone)]
pub enum ConversationRef {
    Existing(Uuid),
    New {
        project_id: Uuid,
        provider: Option<String>,
    },
}

/// Result of a successful send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub conversation: Conversation,
    pub user_message: Message,
    pub assistant_message: Message,
}

/// Per-conversation send locks.
///
/// The outer mutex only guards the map; the per-conversation async mutex is
/// held for the whole send so message ordering stays deterministic.
#[derive(Default)]
struct SendLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SendLocks {
    async fn acquire(&self, conversation_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("send locks poisoned");
            map.entry(conversation_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Apply the configured policy to a failed retrieval: degrade to empty
/// context, or surface the failure.
fn retrieval_or_degrade(
    outcome: Result<Vec<SearchResultItem>>,
    degrade: bool,
) -> Result<Vec<SearchResultItem>> {
    match outcome {
        Ok(results) => Ok(results),
        Err(e) if degrade => {
            warn!(error = %e, "Retrieval failed, continuing with empty context");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Retrieval-augmented chat engine
pub struct ChatEngine {
    repository: Repository,
    search: SearchService,
    providers: ProviderRegistry,
    config: ChatConfig,
    locks: SendLocks,
}

impl ChatEngine {
    pub fn new(
        repository: Repository,
        search: SearchService,
        providers: ProviderRegistry,
        config: ChatConfig,
    ) -> Self {
        Self {
            repository,
            search,
            providers,
            config,
            locks: SendLocks::default(),
        }
    }

    /// Create a conversation explicitly (the POST /conversations path)
    pub async fn create_conversation(
        &self,
        project_id: Uuid,
        provider: Option<String>,
        title: Option<String>,
    ) -> Result<Conversation> {
        self.repository
            .find_project_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound {
                id: project_id.to_string(),
            })?;

        let provider = self.resolve_provider(provider)?;

        self.repository
            .create_conversation(project_id, &provider, title)
            .await
    }

    /// Send a user message and produce the grounded assistant reply.
    ///
    /// The user message is persisted before anything can fail downstream; a
    /// generation failure leaves it in place with no assistant message, so
    /// the caller may simply retry.
    #[instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        conversation_ref: ConversationRef,
        content: &str,
    ) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            return Err(AppError::Validation {
                message: "Message content must not be empty".to_string(),
                field: Some("content".to_string()),
            });
        }

        let start = Instant::now();

        let conversation = self.resolve_conversation(conversation_ref).await?;

        // One in-flight send per conversation
        let _guard = self.locks.acquire(conversation.id).await;

        let user_message = self
            .repository
            .create_message(conversation.id, MessageRole::User, content, None)
            .await?;

        let retrieval = self
            .search
            .search(conversation.project_id, content, self.config.top_k)
            .await;
        let results = retrieval_or_degrade(retrieval, self.config.degrade_on_search_failure)?;

        let (reply, citations) = if results.is_empty() {
            (NO_CONTEXT_REPLY.to_string(), Vec::new())
        } else {
            let generator = self.providers.get(&conversation.provider).ok_or_else(|| {
                AppError::Configuration {
                    message: format!(
                        "Conversation references unknown provider: {}",
                        conversation.provider
                    ),
                }
            })?;

            let context = assemble_context(&results);
            let reply = generator
                .generate(GROUNDED_SYSTEM_PROMPT, &context, content)
                .await?;

            (reply, build_citations(&results))
        };

        let assistant_message = self
            .repository
            .create_message(
                conversation.id,
                MessageRole::Assistant,
                &reply,
                Some(citations),
            )
            .await?;

        let conversation = if conversation.title.is_none() {
            let title = derive_title(content, self.config.title_max_chars);
            self.repository
                .set_conversation_title(conversation.id, &title)
                .await?
        } else {
            self.repository.touch_conversation(conversation.id).await?;
            conversation
        };

        metrics::record_chat(start.elapsed().as_secs_f64());

        info!(
            conversation_id = %conversation.id,
            sources = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Message exchange complete"
        );

        Ok(SendOutcome {
            conversation,
            user_message,
            assistant_message,
        })
    }

    /// Fetch a conversation with its messages in chronological order
    pub async fn conversation_with_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<(Conversation, Vec<Message>)> {
        let conversation = self
            .repository
            .find_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound {
                id: conversation_id.to_string(),
            })?;

        let messages = self.repository.list_messages(conversation_id).await?;

        Ok((conversation, messages))
    }

    /// List a project's recent conversations
    pub async fn list_conversations(&self, project_id: Uuid) -> Result<Vec<Conversation>> {
        self.repository
            .find_project_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound {
                id: project_id.to_string(),
            })?;

        self.repository
            .list_conversations_by_project(project_id, 10)
            .await
    }

    async fn resolve_conversation(&self, conversation_ref: ConversationRef) -> Result<Conversation> {
        match conversation_ref {
            ConversationRef::Existing(id) => self
                .repository
                .find_conversation_by_id(id)
                .await?
                .ok_or_else(|| AppError::ConversationNotFound { id: id.to_string() }),
            ConversationRef::New {
                project_id,
                provider,
            } => self.create_conversation(project_id, provider, None).await,
        }
    }

    fn resolve_provider(&self, provider: Option<String>) -> Result<String> {
        let name = provider.unwrap_or_else(|| self.config.provider.clone());

        if !self.providers.contains(&name) {
            return Err(AppError::Validation {
                message: format!("Unknown language-model provider: {}", name),
                field: Some("provider".to_string()),
            });
        }

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(score: f64) -> SearchResultItem {
        SearchResultItem {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            chunk_text: "text".to_string(),
            similarity_score: score,
            anchor: None,
            metadata: dochub_search::ChunkMetadata {
                file_path: "a.md".to_string(),
                file_name: "a.md".to_string(),
                file_type: "md".to_string(),
                chunk_position: 0,
                total_chunks: 1,
            },
        }
    }

    #[test]
    fn test_degrade_policy_swallows_search_failure() {
        let failed: Result<Vec<SearchResultItem>> = Err(AppError::EmbeddingError {
            message: "down".to_string(),
        });
        let results = retrieval_or_degrade(failed, true).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_surface_policy_propagates_search_failure() {
        let failed: Result<Vec<SearchResultItem>> = Err(AppError::EmbeddingError {
            message: "down".to_string(),
        });
        let err = retrieval_or_degrade(failed, false).unwrap_err();
        assert!(matches!(err, AppError::EmbeddingError { .. }));
    }

    #[test]
    fn test_successful_retrieval_passes_through() {
        let ok: Result<Vec<SearchResultItem>> = Ok(vec![item(0.9), item(0.5)]);
        let results = retrieval_or_degrade(ok, true).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_send_locks_serialize_per_conversation() {
        let locks = SendLocks::default();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;

        // A second acquire on the same conversation must wait
        let pending = {
            let lock = {
                let mut map = locks.inner.lock().unwrap();
                map.get_mut(&id).unwrap().clone()
            };
            lock.try_lock_owned()
        };
        assert!(pending.is_err());

        // A different conversation is unaffected
        let other = locks.acquire(Uuid::new_v4()).await;
        drop(other);
        drop(guard);

        // After release the conversation can be locked again
        let _again = locks.acquire(id).await;
    }
}
