//! Project note entity - free-text updates and decisions recorded on a project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project note database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_notes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project the note is about
    pub project_id: i64,
    /// Note text
    pub note: String,
    /// Flagged for attention
    pub is_important: bool,
    /// Who wrote it, when known
    pub created_by: Option<String>,
    /// When the note was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between notes and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each note belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
