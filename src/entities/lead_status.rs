//! Lead status entity - pipeline stages of a sales opportunity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lead status database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead_statuses")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code, e.g. `"QUOTE_SENT"`
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Position in the sales pipeline
    pub sequence_order: i32,
    /// Terminal status (won or lost)
    pub is_final: bool,
    /// Terminal and won
    pub is_won: bool,
    /// Terminal and lost
    pub is_lost: bool,
}

/// `LeadStatus` is only referenced, never navigated from
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
