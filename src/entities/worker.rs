//! Worker entity - a tradesperson who can be matched to requirements.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Worker database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workers")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-facing unique code, e.g. `"WRK-00007"`
    #[sea_orm(unique)]
    pub worker_code: String,
    /// Worker's name
    pub name: String,
    /// Primary trade
    pub role_id: i64,
    /// Contact number
    pub phone: String,
    /// Postal code the worker is based in
    pub primary_pincode: String,
    /// Inactive workers are never matched or alerted on
    pub active_status: bool,
    /// Date the worker joined
    pub joined_date: Date,
}

/// Defines relationships between Worker and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Primary trade
    #[sea_orm(
        belongs_to = "super::worker_role::Entity",
        from = "Column::RoleId",
        to = "super::worker_role::Column::Id"
    )]
    Role,
    /// Ledger entries for this worker
    #[sea_orm(has_many = "super::worker_credit_ledger::Entity")]
    CreditLedger,
}

impl Related<super::worker_credit_ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditLedger.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
