//! Worker role entity - trades a worker can be hired for.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Worker role database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worker_roles")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code, e.g. `"MASON"`
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Whether the role is offered for new requirements
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
