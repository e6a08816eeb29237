//! Reference data seeding.
//!
//! Inserts every row of a [`MasterData`] set that is not already present
//! (matched by `code`), optionally wiping the reference tables first. The whole
//! load runs in one database transaction.

use crate::{
    config::master_data::{
        CodeNameConfig, LeadStatusConfig, MasterData, RoleConfig, StageConfig, UrgencyConfig,
    },
    entities::{
        ConstructionStage, CreditTransactionType, LeadStatus, RequirementStatus, UrgencyLevel,
        WorkerRole, construction_stage, credit_transaction_type, lead_status, requirement_status,
        urgency_level, worker_role,
    },
    errors::Result,
};
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Per-table outcome of a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    /// Table name
    pub table: &'static str,
    /// Rows inserted by this load
    pub created: usize,
    /// Rows whose code was already present
    pub existing: usize,
}

/// Outcome of [`load_master_data`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDataReport {
    /// Whether the reference tables were cleared first
    pub reset: bool,
    /// One entry per reference table, in load order
    pub tables: Vec<TableLoad>,
}

impl MasterDataReport {
    /// Entry for `table`, if it was part of the load.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TableLoad> {
        self.tables.iter().find(|load| load.table == table)
    }
}

/// Reference-data rows keyed by a stable code
trait Coded {
    fn code(&self) -> &str;
}

macro_rules! impl_coded {
    ($($config:ty),+) => {
        $(impl Coded for $config {
            fn code(&self) -> &str {
                &self.code
            }
        })+
    };
}

impl_coded!(
    StageConfig,
    LeadStatusConfig,
    RoleConfig,
    CodeNameConfig,
    UrgencyConfig
);

/// Inserts each row of `rows` whose code is not yet in `code_column`.
async fn seed_by_code<A, T>(
    txn: &DatabaseTransaction,
    table: &'static str,
    code_column: impl ColumnTrait,
    rows: &[T],
    build: impl Fn(&T) -> A,
) -> Result<TableLoad>
where
    A: ActiveModelTrait,
    T: Coded,
{
    let mut load = TableLoad {
        table,
        created: 0,
        existing: 0,
    };
    for row in rows {
        let found = <A::Entity as EntityTrait>::find()
            .filter(code_column.eq(row.code()))
            .one(txn)
            .await?;
        if found.is_some() {
            load.existing += 1;
            continue;
        }
        <A::Entity as EntityTrait>::insert(build(row)).exec(txn).await?;
        load.created += 1;
    }
    Ok(load)
}

/// Loads `data` into the reference tables.
///
/// Existing codes are left untouched, so running the same load twice creates
/// nothing the second time. With `reset`, all reference rows are deleted
/// before loading; that fails, and rolls back, while projects, workers or
/// ledger entries still reference them.
#[instrument(skip(db, data))]
pub async fn load_master_data(
    db: &DatabaseConnection,
    data: &MasterData,
    reset: bool,
) -> Result<MasterDataReport> {
    data.validate()?;
    let txn = db.begin().await?;

    if reset {
        warn!("Resetting reference tables");
        CreditTransactionType::delete_many().exec(&txn).await?;
        UrgencyLevel::delete_many().exec(&txn).await?;
        RequirementStatus::delete_many().exec(&txn).await?;
        WorkerRole::delete_many().exec(&txn).await?;
        LeadStatus::delete_many().exec(&txn).await?;
        ConstructionStage::delete_many().exec(&txn).await?;
    }

    let tables = vec![
        seed_by_code(
            &txn,
            "construction_stages",
            construction_stage::Column::Code,
            &data.construction_stages,
            |stage| construction_stage::ActiveModel {
                code: Set(stage.code.clone()),
                name: Set(stage.name.clone()),
                description: Set(stage.description.clone()),
                sequence_order: Set(stage.sequence_order),
                default_margin_priority: Set(stage.default_margin_priority),
                is_active: Set(stage.is_active),
                ..Default::default()
            },
        )
        .await?,
        seed_by_code(
            &txn,
            "lead_statuses",
            lead_status::Column::Code,
            &data.lead_statuses,
            |status| lead_status::ActiveModel {
                code: Set(status.code.clone()),
                name: Set(status.name.clone()),
                sequence_order: Set(status.sequence_order),
                is_final: Set(status.is_final),
                is_won: Set(status.is_won),
                is_lost: Set(status.is_lost),
                ..Default::default()
            },
        )
        .await?,
        seed_by_code(
            &txn,
            "worker_roles",
            worker_role::Column::Code,
            &data.worker_roles,
            |role| worker_role::ActiveModel {
                code: Set(role.code.clone()),
                name: Set(role.name.clone()),
                is_active: Set(role.is_active),
                ..Default::default()
            },
        )
        .await?,
        seed_by_code(
            &txn,
            "requirement_statuses",
            requirement_status::Column::Code,
            &data.requirement_statuses,
            |status| requirement_status::ActiveModel {
                code: Set(status.code.clone()),
                name: Set(status.name.clone()),
                ..Default::default()
            },
        )
        .await?,
        seed_by_code(
            &txn,
            "urgency_levels",
            urgency_level::Column::Code,
            &data.urgency_levels,
            |level| urgency_level::ActiveModel {
                code: Set(level.code.clone()),
                name: Set(level.name.clone()),
                priority_score: Set(level.priority_score),
                ..Default::default()
            },
        )
        .await?,
        seed_by_code(
            &txn,
            "credit_transaction_types",
            credit_transaction_type::Column::Code,
            &data.credit_transaction_types,
            |kind| credit_transaction_type::ActiveModel {
                code: Set(kind.code.clone()),
                name: Set(kind.name.clone()),
                ..Default::default()
            },
        )
        .await?,
    ];

    txn.commit().await?;

    for load in &tables {
        info!(
            "{}: {} created, {} already present",
            load.table, load.created, load.existing
        );
    }
    Ok(MasterDataReport { reset, tables })
}
