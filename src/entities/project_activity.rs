//! Project activity entity - the timeline of lifecycle events on a project.
//!
//! `activity_type` holds one of the codes from
//! [`ActivityKind`](crate::core::activity::ActivityKind).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project activity database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_activities")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project the event happened on
    pub project_id: i64,
    /// Event code, e.g. `"STAGE_CHANGE"`
    pub activity_type: String,
    /// Human-readable description
    pub description: String,
    /// Value before the change, for change events
    pub old_value: Option<String>,
    /// Value after the change, for change events
    pub new_value: Option<String>,
    /// Worker involved, for worker events
    pub related_worker_id: Option<i64>,
    /// When the event was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between activities and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each activity belongs to one project
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
