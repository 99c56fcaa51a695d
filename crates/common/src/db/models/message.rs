//! Message entity
//!
//! Immutable once created; creation order defines conversational history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Message role enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl From<String> for MessageRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => "user".to_string(),
            MessageRole::Assistant => "assistant".to_string(),
        }
    }
}

/// One entry of an assistant message's ordered citation list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub document_id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub anchor: Option<String>,
    pub similarity_score: f32,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub conversation_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub role: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Ordered citation list for assistant messages, null for user messages
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub sources: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversation::Entity",
        from = "Column::ConversationId",
        to = "super::conversation::Column::Id",
        on_delete = "Cascade"
    )]
    Conversation,
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Get the role as an enum
    pub fn message_role(&self) -> MessageRole {
        MessageRole::from(self.role.clone())
    }

    /// Deserialize the citation list, if present
    pub fn citations(&self) -> Option<Vec<SourceCitation>> {
        self.sources
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(MessageRole::from(String::from("assistant")), MessageRole::Assistant);
        assert_eq!(String::from(MessageRole::User), "user");
    }
}
