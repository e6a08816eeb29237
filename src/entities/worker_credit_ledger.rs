//! Worker credit ledger entity - the per-worker running-balance ledger.
//!
//! Each row carries the balance after applying it:
//! `running_balance(n) = running_balance(n - 1) + debit(n) - credit(n)`,
//! ordered by `id` within one worker. Monetary fields never change after
//! insert; corrections are new rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "worker_credit_ledger")]
pub struct Model {
    /// Unique identifier, also the ledger order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Worker whose ledger this is
    pub worker_id: i64,
    /// Project the entry relates to, if any
    pub project_id: Option<i64>,
    /// Classification of the entry
    pub transaction_type_id: i64,
    /// Amount added to the balance
    pub debit: f64,
    /// Amount taken off the balance
    pub credit: f64,
    /// Balance after this entry
    pub running_balance: f64,
    /// Business date of the entry
    pub entry_date: Date,
    /// Date by which the entry should be settled
    pub due_date: Option<Date>,
    /// Whether the entry has been settled
    pub is_settled: bool,
    /// Free-text notes
    pub notes: Option<String>,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between ledger entries and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one worker
    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id"
    )]
    Worker,
    /// Related project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Entry classification
    #[sea_orm(
        belongs_to = "super::credit_transaction_type::Entity",
        from = "Column::TransactionTypeId",
        to = "super::credit_transaction_type::Column::Id"
    )]
    TransactionType,
}

impl Related<super::worker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Worker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
