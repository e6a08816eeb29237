//! Worker assignment entity - fills a requirement with a worker.
//!
//! `requirement_id` is unique, making the requirement/assignment relation
//! one-to-one. Only the completion fields change after creation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Worker assignment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worker_assignments")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requirement being filled
    #[sea_orm(unique)]
    pub requirement_id: i64,
    /// Assigned worker
    pub worker_id: i64,
    /// Date the worker was assigned
    pub assigned_date: Date,
    /// Date the work finished
    pub completion_date: Option<Date>,
    /// Revenue attributed to the assignment on completion
    pub revenue_impact: f64,
}

/// Defines relationships between `WorkerAssignment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The filled requirement
    #[sea_orm(
        belongs_to = "super::project_worker_requirement::Entity",
        from = "Column::RequirementId",
        to = "super::project_worker_requirement::Column::Id"
    )]
    Requirement,
    /// The assigned worker
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id"
    )]
    Worker,
}

impl Related<super::project_worker_requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
