//! Chunk entity with embedding and navigational anchor
//!
//! A document's chunk set is always replaced wholesale; positions form the
//! contiguous range [0, total_chunks - 1].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub document_id: Uuid,

    /// Zero-based position within the document
    pub chunk_index: i32,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// pgvector embedding stored as text for SeaORM compatibility
    /// Actual vector operations done via raw SQL
    #[sea_orm(column_type = "Text", nullable)]
    pub embedding: Option<String>,

    /// Nearest preceding heading slug, null outside markdown sections
    #[sea_orm(column_type = "Text", nullable)]
    pub anchor: Option<String>,

    pub total_chunks: i32,

    // Denormalized document metadata for search results
    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    #[sea_orm(column_type = "Text")]
    pub file_name: String,

    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_delete = "Cascade"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse embedding from stored text format to Vec<f32>
    pub fn parse_embedding(&self) -> Option<Vec<f32>> {
        self.embedding.as_ref().and_then(|s| {
            // Format: "[1.0,2.0,3.0,...]"
            let inner = s.trim_start_matches('[').trim_end_matches(']');
            inner
                .split(',')
                .map(|v| v.trim().parse::<f32>().ok())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunk_with_embedding(embedding: Option<&str>) -> Model {
        Model {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            chunk_index: 0,
            content: "text".to_string(),
            embedding: embedding.map(String::from),
            anchor: None,
            total_chunks: 1,
            file_path: "docs/a.md".to_string(),
            file_name: "a.md".to_string(),
            file_type: "md".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_parse_embedding() {
        let chunk = chunk_with_embedding(Some("[1.0, 2.5,-0.5]"));
        assert_eq!(chunk.parse_embedding(), Some(vec![1.0, 2.5, -0.5]));
    }

    #[test]
    fn test_parse_embedding_absent() {
        let chunk = chunk_with_embedding(None);
        assert_eq!(chunk.parse_embedding(), None);
    }
}
