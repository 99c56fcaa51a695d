//! Source entity - a configured documentation origin
//!
//! Timestamps are written only at sync completion, never mid-flight.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub project_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Repository URL, e.g. https://github.com/owner/repo
    #[sea_orm(column_type = "Text")]
    pub repo_url: String,

    /// Optional subtree scope inside the repository, e.g. "docs"
    #[sea_orm(column_type = "Text", nullable)]
    pub folder_path: Option<String>,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    /// Timestamp of the newest known upstream commit touching the scope
    pub last_upstream_change_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,

    #[sea_orm(has_many = "super::document::Entity")]
    Document,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether upstream moved past the last completed sync
    pub fn needs_update(&self) -> bool {
        match (self.last_synced_at, self.last_upstream_change_at) {
            (Some(synced), Some(upstream)) => synced < upstream,
            _ => false,
        }
    }
}
