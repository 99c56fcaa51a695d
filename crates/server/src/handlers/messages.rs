//! Message handlers
//!
//! The RAG workflow behind both endpoints: the user message is stored,
//! relevant chunks are retrieved, the model answers from that context, and
//! the assistant message is stored with its citations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::conversations::{ConversationResponse, MessageResponse};
use crate::AppState;
use dochub_chat::ConversationRef;
use dochub_common::errors::Result;

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    /// Provider for the lazily created conversation (project-level sends)
    pub provider: Option<String>,
}

/// Both sides of one exchange
#[derive(Serialize)]
pub struct SendMessageResponse {
    pub conversation: ConversationResponse,
    pub user_message: MessageResponse,
    pub assistant_message: MessageResponse,
}

/// Send a message in an existing conversation
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .chat
        .send_message(ConversationRef::Existing(conversation_id), &request.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            conversation: ConversationResponse::from(outcome.conversation),
            user_message: MessageResponse::from(outcome.user_message),
            assistant_message: MessageResponse::from(outcome.assistant_message),
        }),
    ))
}

/// Send a message on a fresh conversation.
///
/// The conversation is created lazily and its title derived from this first
/// message.
pub async fn send_project_message(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .chat
        .send_message(
            ConversationRef::New {
                project_id,
                provider: request.provider,
            },
            &request.content,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            conversation: ConversationResponse::from(outcome.conversation),
            user_message: MessageResponse::from(outcome.user_message),
            assistant_message: MessageResponse::from(outcome.assistant_message),
        }),
    ))
}
