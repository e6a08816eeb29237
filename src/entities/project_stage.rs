//! Project stage entity - one project's share of one construction stage.
//!
//! Rows are seeded for every active stage when a project is created and are
//! never deleted. `captured_stage_revenue` only grows, and only through
//! recorded revenue transactions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project stage database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_stages")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning project
    pub project_id: i64,
    /// Construction stage this row covers
    pub stage_id: i64,
    /// Portion of the project estimate allotted to this stage
    pub estimated_stage_value: f64,
    /// Revenue invoiced against this stage so far
    pub captured_stage_revenue: f64,
    /// Expected margin for the stage, in percent
    pub expected_margin_percentage: f64,
    /// Whether the stage has been finished on site
    pub is_completed: bool,
    /// Date the stage was marked finished
    pub completion_date: Option<Date>,
}

/// Defines relationships between `ProjectStage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Each row covers one construction stage
    #[sea_orm(
        belongs_to = "super::construction_stage::Entity",
        from = "Column::StageId",
        to = "super::construction_stage::Column::Id"
    )]
    Stage,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::construction_stage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
