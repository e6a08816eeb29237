//! Project worker requirement entity - open demand for a trade on a project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Requirement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_worker_requirements")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project needing the worker
    pub project_id: i64,
    /// Trade required
    pub role_id: i64,
    /// Date the worker is needed from
    pub required_from_date: Date,
    /// How pressing the requirement is
    pub urgency_id: i64,
    /// Lifecycle status
    pub status_id: i64,
    /// When the requirement was raised
    pub created_at: DateTimeUtc,
}

/// Defines relationships between requirements and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each requirement belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Required trade
    #[sea_orm(
        belongs_to = "super::worker_role::Entity",
        from = "Column::RoleId",
        to = "super::worker_role::Column::Id"
    )]
    Role,
    /// Urgency
    #[sea_orm(
        belongs_to = "super::urgency_level::Entity",
        from = "Column::UrgencyId",
        to = "super::urgency_level::Column::Id"
    )]
    Urgency,
    /// Lifecycle status
    #[sea_orm(
        belongs_to = "super::requirement_status::Entity",
        from = "Column::StatusId",
        to = "super::requirement_status::Column::Id"
    )]
    Status,
    /// At most one assignment fills a requirement
    #[sea_orm(has_one = "super::worker_assignment::Entity")]
    Assignment,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::worker_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
