//! Urgency level entity - how pressing a worker requirement is.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Urgency level database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "urgency_levels")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code, e.g. `"URGENT"`
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Higher is more urgent
    pub priority_score: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
