//! Construction stage entity - the physical phases of building work.
//!
//! Stages are reference data: they are loaded once by the master-data loader
//! and ordered by `sequence_order`, which is unique and defines the total order
//! every project moves through.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Construction stage database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "construction_stages")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code, e.g. `"FOUNDATION"`
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Free-text description of the work in this stage
    pub description: String,
    /// Position in the construction order (1 = first)
    #[sea_orm(unique)]
    pub sequence_order: i32,
    /// Relative weight used to split a project's estimate across stages
    pub default_margin_priority: i32,
    /// Inactive stages are not seeded into new projects
    pub is_active: bool,
}

/// Defines relationships between `ConstructionStage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One stage has many project stage rows
    #[sea_orm(has_many = "super::project_stage::Entity")]
    ProjectStages,
}

impl Related<super::project_stage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectStages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
