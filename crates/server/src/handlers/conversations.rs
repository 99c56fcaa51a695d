//! Conversation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use dochub_common::db::models::{Conversation, Message};
use dochub_common::errors::Result;

/// Request to create a conversation
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Provider name; defaults to the configured provider
    pub provider: Option<String>,
    /// Optional title; derived from the first message when absent
    pub title: Option<String>,
}

/// Conversation response
#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            project_id: c.project_id,
            provider: c.provider,
            title: c.title,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// Message response
#[derive(Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            role: m.role,
            content: m.content,
            sources: m.sources,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Conversation with its messages in chronological order
#[derive(Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

/// Create a conversation for a project
pub async fn create_conversation(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    let conversation = state
        .chat
        .create_conversation(project_id, request.provider, request.title)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ConversationResponse::from(conversation)),
    ))
}

/// List a project's recent conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ConversationResponse>>> {
    let conversations = state.chat.list_conversations(project_id).await?;

    Ok(Json(
        conversations
            .into_iter()
            .map(ConversationResponse::from)
            .collect(),
    ))
}

/// Get a conversation with all its messages
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationWithMessages>> {
    let (conversation, messages) = state.chat.conversation_with_messages(conversation_id).await?;

    Ok(Json(ConversationWithMessages {
        conversation: ConversationResponse::from(conversation),
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}
