//! Entity module - Contains all SeaORM entity definitions for the database.
//! Reference tables (stages, statuses, roles, urgency levels, credit types)
//! come first; the project, worker, revenue and ledger tables build on them.

pub mod admin_user;
pub mod construction_stage;
pub mod credit_transaction_type;
pub mod lead_status;
pub mod project;
pub mod project_activity;
pub mod project_note;
pub mod project_revenue_transaction;
pub mod project_stage;
pub mod project_worker_requirement;
pub mod requirement_status;
pub mod urgency_level;
pub mod worker;
pub mod worker_assignment;
pub mod worker_credit_ledger;
pub mod worker_project;
pub mod worker_role;

// Re-export specific types to avoid conflicts
pub use admin_user::{Entity as AdminUser, Model as AdminUserModel};
pub use construction_stage::{Entity as ConstructionStage, Model as ConstructionStageModel};
pub use credit_transaction_type::{
    Entity as CreditTransactionType, Model as CreditTransactionTypeModel,
};
pub use lead_status::{Entity as LeadStatus, Model as LeadStatusModel};
pub use project::{Entity as Project, Model as ProjectModel};
pub use project_activity::{Entity as ProjectActivity, Model as ProjectActivityModel};
pub use project_note::{Entity as ProjectNote, Model as ProjectNoteModel};
pub use project_revenue_transaction::{
    Entity as ProjectRevenueTransaction, Model as ProjectRevenueTransactionModel,
};
pub use project_stage::{Entity as ProjectStage, Model as ProjectStageModel};
pub use project_worker_requirement::{
    Entity as ProjectWorkerRequirement, Model as ProjectWorkerRequirementModel,
};
pub use requirement_status::{Entity as RequirementStatus, Model as RequirementStatusModel};
pub use urgency_level::{Entity as UrgencyLevel, Model as UrgencyLevelModel};
pub use worker::{Entity as Worker, Model as WorkerModel};
pub use worker_assignment::{Entity as WorkerAssignment, Model as WorkerAssignmentModel};
pub use worker_credit_ledger::{Entity as WorkerCreditLedger, Model as WorkerCreditLedgerModel};
pub use worker_project::{Entity as WorkerProject, Model as WorkerProjectModel};
pub use worker_role::{Entity as WorkerRole, Model as WorkerRoleModel};
