//! In-memory reference data catalog.
//!
//! Reference tables change only through the master-data loader, so they are
//! read once into an immutable [`ReferenceCatalog`] and passed to the engine
//! functions that need stage ordering or status codes, instead of being
//! re-queried on every call.

use crate::{
    entities::{
        ConstructionStage, CreditTransactionType, LeadStatus, RequirementStatus, UrgencyLevel,
        WorkerRole, construction_stage, credit_transaction_type, lead_status, requirement_status,
        urgency_level, worker_role,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use tracing::debug;

/// Requirement status codes the assignment engine transitions through.
pub mod requirement_codes {
    /// Waiting for a worker
    pub const OPEN: &str = "OPEN";
    /// A worker has been assigned
    pub const ASSIGNED: &str = "ASSIGNED";
    /// The assigned work is finished
    pub const COMPLETED: &str = "COMPLETED";
}

/// Immutable snapshot of every reference table
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    stages: Vec<construction_stage::Model>,
    lead_statuses: Vec<lead_status::Model>,
    roles: Vec<worker_role::Model>,
    urgency_levels: Vec<urgency_level::Model>,
    requirement_statuses: Vec<requirement_status::Model>,
    credit_types: Vec<credit_transaction_type::Model>,
}

impl ReferenceCatalog {
    /// Reads every reference table. Stages are kept in sequence order.
    pub async fn load<C>(db: &C) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let catalog = Self {
            stages: ConstructionStage::find()
                .order_by_asc(construction_stage::Column::SequenceOrder)
                .all(db)
                .await?,
            lead_statuses: LeadStatus::find()
                .order_by_asc(lead_status::Column::SequenceOrder)
                .all(db)
                .await?,
            roles: WorkerRole::find().all(db).await?,
            urgency_levels: UrgencyLevel::find()
                .order_by_asc(urgency_level::Column::PriorityScore)
                .all(db)
                .await?,
            requirement_statuses: RequirementStatus::find().all(db).await?,
            credit_types: CreditTransactionType::find().all(db).await?,
        };
        debug!(
            stages = catalog.stages.len(),
            lead_statuses = catalog.lead_statuses.len(),
            roles = catalog.roles.len(),
            "Reference catalog loaded"
        );
        Ok(catalog)
    }

    /// All stages, in construction sequence.
    #[must_use]
    pub fn stages(&self) -> &[construction_stage::Model] {
        &self.stages
    }

    /// Active stages, in construction sequence.
    pub fn active_stages(&self) -> impl Iterator<Item = &construction_stage::Model> {
        self.stages.iter().filter(|stage| stage.is_active)
    }

    /// Stage by id.
    #[must_use]
    pub fn stage(&self, id: i64) -> Option<&construction_stage::Model> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    /// Stage by id, as a not-found error when absent.
    pub fn require_stage(&self, id: i64) -> Result<&construction_stage::Model> {
        self.stage(id)
            .ok_or_else(|| Error::not_found("construction stage", id))
    }

    /// Stage by code.
    #[must_use]
    pub fn stage_by_code(&self, code: &str) -> Option<&construction_stage::Model> {
        self.stages.iter().find(|stage| stage.code == code)
    }

    /// All lead statuses.
    #[must_use]
    pub fn lead_statuses(&self) -> &[lead_status::Model] {
        &self.lead_statuses
    }

    /// Lead status by id.
    #[must_use]
    pub fn lead_status(&self, id: i64) -> Option<&lead_status::Model> {
        self.lead_statuses.iter().find(|status| status.id == id)
    }

    /// Lead status by code.
    #[must_use]
    pub fn lead_status_by_code(&self, code: &str) -> Option<&lead_status::Model> {
        self.lead_statuses.iter().find(|status| status.code == code)
    }

    /// Worker role by id.
    #[must_use]
    pub fn role(&self, id: i64) -> Option<&worker_role::Model> {
        self.roles.iter().find(|role| role.id == id)
    }

    /// Worker role by code.
    #[must_use]
    pub fn role_by_code(&self, code: &str) -> Option<&worker_role::Model> {
        self.roles.iter().find(|role| role.code == code)
    }

    /// Urgency level by id.
    #[must_use]
    pub fn urgency(&self, id: i64) -> Option<&urgency_level::Model> {
        self.urgency_levels.iter().find(|level| level.id == id)
    }

    /// Urgency level by code.
    #[must_use]
    pub fn urgency_by_code(&self, code: &str) -> Option<&urgency_level::Model> {
        self.urgency_levels.iter().find(|level| level.code == code)
    }

    /// Requirement status by code.
    #[must_use]
    pub fn requirement_status_by_code(&self, code: &str) -> Option<&requirement_status::Model> {
        self.requirement_statuses
            .iter()
            .find(|status| status.code == code)
    }

    /// Credit transaction type by code, as a reference-data error when absent.
    pub fn credit_type_by_code(&self, code: &str) -> Result<&credit_transaction_type::Model> {
        self.credit_types
            .iter()
            .find(|kind| kind.code == code)
            .ok_or_else(|| Error::ReferenceDataMissing {
                table: "credit_transaction_types",
                code: code.to_string(),
            })
    }
}
