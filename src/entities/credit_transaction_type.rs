//! Credit transaction type entity - classifies worker ledger entries.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credit transaction type database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_transaction_types")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code, e.g. `"CREDIT_ISSUE"`
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
