//! Document entity - raw ingested file content and metadata
//!
//! Content and fingerprint always update together in a single upsert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supported file type enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Markdown,
    Csv,
    Yaml,
    Json,
    Text,
}

impl FileType {
    /// Map a file extension to a supported type, if any
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(FileType::Markdown),
            "csv" => Some(FileType::Csv),
            "yaml" | "yml" => Some(FileType::Yaml),
            "json" => Some(FileType::Json),
            "txt" => Some(FileType::Text),
            _ => None,
        }
    }

    /// Derive the type from a relative file path
    pub fn from_path(path: &str) -> Option<Self> {
        path.rsplit('.').next().and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Markdown => "md",
            FileType::Csv => "csv",
            FileType::Yaml => "yaml",
            FileType::Json => "json",
            FileType::Text => "txt",
        }
    }
}

impl From<String> for FileType {
    fn from(s: String) -> Self {
        FileType::from_extension(&s).unwrap_or(FileType::Text)
    }
}

impl From<FileType> for String {
    fn from(ft: FileType) -> Self {
        ft.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub source_id: Uuid,

    /// Relative path inside the repository, unique per source
    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// SHA-256 hex digest of the content, used for change detection
    #[sea_orm(column_type = "Text")]
    pub fingerprint: String,

    /// Content size in bytes
    pub size: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::source::Entity",
        from = "Column::SourceId",
        to = "super::source::Column::Id",
        on_delete = "Cascade"
    )]
    Source,

    #[sea_orm(has_many = "super::chunk::Entity")]
    Chunk,
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl Related<super::chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunk.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// File name component of the relative path
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }

    /// Get the file type as an enum
    pub fn kind(&self) -> FileType {
        FileType::from(self.file_type.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("md"), Some(FileType::Markdown));
        assert_eq!(FileType::from_extension("YML"), Some(FileType::Yaml));
        assert_eq!(FileType::from_extension("rs"), None);
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(FileType::from_path("docs/guide.md"), Some(FileType::Markdown));
        assert_eq!(FileType::from_path("data/export.csv"), Some(FileType::Csv));
        assert_eq!(FileType::from_path("src/main.rs"), None);
    }
}
