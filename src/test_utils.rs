//! Shared test utilities.
//!
//! Helpers for setting up in-memory databases with reference data and for
//! creating projects, workers and requirements with sensible defaults.

use crate::{
    config::master_data::{
        CodeNameConfig, LeadStatusConfig, MasterData, RoleConfig, StageConfig, UrgencyConfig,
    },
    core::{
        assignment::{self, NewRequirement},
        catalog::ReferenceCatalog,
        master_data::load_master_data,
        project::{self, NewProject},
        today,
        worker::{self, NewWorker},
    },
    entities,
    errors::{Error, Result},
};
use chrono::Duration;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// In-memory database seeded with the built-in reference data.
pub async fn setup_with_catalog() -> Result<(DatabaseConnection, ReferenceCatalog)> {
    let db = setup_test_db().await?;
    load_master_data(&db, &MasterData::builtin()?, false).await?;
    let catalog = ReferenceCatalog::load(&db).await?;
    Ok((db, catalog))
}

/// In-memory database seeded with [`two_stage_master_data`].
pub async fn setup_with_two_stages() -> Result<(DatabaseConnection, ReferenceCatalog)> {
    let db = setup_test_db().await?;
    load_master_data(&db, &two_stage_master_data(), false).await?;
    let catalog = ReferenceCatalog::load(&db).await?;
    Ok((db, catalog))
}

fn code_name(code: &str, name: &str) -> CodeNameConfig {
    CodeNameConfig {
        code: code.to_string(),
        name: name.to_string(),
    }
}

/// A minimal reference data set.
///
/// # Contents
/// * stages: `STAGE_A` (sequence 1, weight 3), `STAGE_B` (sequence 2, weight 5)
/// * lead statuses: `NEW`, `WON`
/// * roles: `MASON`, `PLUMBER`
/// * requirement statuses: `OPEN`, `ASSIGNED`, `COMPLETED`
/// * urgency levels: `MEDIUM`, `HIGH`
/// * credit types: `CREDIT_ISSUE`, `PAYMENT_RECEIVED`
#[must_use]
pub fn two_stage_master_data() -> MasterData {
    MasterData {
        construction_stages: vec![
            StageConfig {
                code: "STAGE_A".to_string(),
                name: "Stage A".to_string(),
                sequence_order: 1,
                description: String::new(),
                default_margin_priority: 3,
                is_active: true,
            },
            StageConfig {
                code: "STAGE_B".to_string(),
                name: "Stage B".to_string(),
                sequence_order: 2,
                description: String::new(),
                default_margin_priority: 5,
                is_active: true,
            },
        ],
        lead_statuses: vec![
            LeadStatusConfig {
                code: "NEW".to_string(),
                name: "New Lead".to_string(),
                sequence_order: 1,
                is_final: false,
                is_won: false,
                is_lost: false,
            },
            LeadStatusConfig {
                code: "WON".to_string(),
                name: "Won".to_string(),
                sequence_order: 2,
                is_final: true,
                is_won: true,
                is_lost: false,
            },
        ],
        worker_roles: vec![
            RoleConfig {
                code: "MASON".to_string(),
                name: "Mason".to_string(),
                is_active: true,
            },
            RoleConfig {
                code: "PLUMBER".to_string(),
                name: "Plumber".to_string(),
                is_active: true,
            },
        ],
        requirement_statuses: vec![
            code_name("OPEN", "Open"),
            code_name("ASSIGNED", "Assigned"),
            code_name("COMPLETED", "Completed"),
        ],
        urgency_levels: vec![
            UrgencyConfig {
                code: "MEDIUM".to_string(),
                name: "Medium".to_string(),
                priority_score: 3,
            },
            UrgencyConfig {
                code: "HIGH".to_string(),
                name: "High".to_string(),
                priority_score: 5,
            },
        ],
        credit_transaction_types: vec![
            code_name("CREDIT_ISSUE", "Credit Issued"),
            code_name("PAYMENT_RECEIVED", "Payment Received"),
        ],
    }
}

/// Id of the `NEW` lead status, or 0 when the catalog has none.
#[must_use]
pub fn new_lead(catalog: &ReferenceCatalog) -> i64 {
    catalog.lead_status_by_code("NEW").map_or(0, |status| status.id)
}

/// Project input with sensible defaults.
///
/// # Defaults
/// * `pincode`: `"560001"`
/// * `city`: `"Bengaluru"`
/// * `phone`: `"+919876543210"`
/// * generated project code
#[must_use]
pub fn sample_new_project(stage_id: i64, lead_status_id: i64, value: f64) -> NewProject {
    NewProject {
        project_code: None,
        name: "Lakeview Villa".to_string(),
        client_name: "A. Client".to_string(),
        phone: Some("+919876543210".to_string()),
        full_address: "12 Lake Road".to_string(),
        pincode: "560001".to_string(),
        city: "Bengaluru".to_string(),
        latitude: None,
        longitude: None,
        estimated_total_value: value,
        current_stage_id: stage_id,
        lead_status_id,
        expected_completion_date: None,
    }
}

/// Creates a project at the first stage with the `NEW` lead status.
pub async fn create_test_project(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    value: f64,
) -> Result<entities::project::Model> {
    let first_stage = catalog
        .active_stages()
        .next()
        .ok_or_else(|| Error::not_found("construction stage", "first"))?;
    project::create_project(
        db,
        catalog,
        sample_new_project(first_stage.id, new_lead(catalog), value),
    )
    .await
}

/// Creates an active worker of the given role, based in `pincode`.
pub async fn create_test_worker(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    role_code: &str,
    pincode: &str,
) -> Result<entities::worker::Model> {
    let role = catalog
        .role_by_code(role_code)
        .ok_or_else(|| Error::not_found("worker role", role_code))?;
    worker::create_worker(
        db,
        catalog,
        NewWorker {
            worker_code: None,
            name: format!("Test {}", role.name),
            role_id: role.id,
            phone: "9876543210".to_string(),
            primary_pincode: pincode.to_string(),
            joined_date: None,
        },
    )
    .await
}

/// Opens a requirement for `role_code` on a project, needed from today at
/// `MEDIUM` urgency.
pub async fn create_test_requirement(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
    role_code: &str,
) -> Result<entities::project_worker_requirement::Model> {
    let role = catalog
        .role_by_code(role_code)
        .ok_or_else(|| Error::not_found("worker role", role_code))?;
    let urgency = catalog
        .urgency_by_code("MEDIUM")
        .ok_or_else(|| Error::not_found("urgency level", "MEDIUM"))?;
    assignment::create_requirement(
        db,
        catalog,
        NewRequirement {
            project_id,
            role_id: role.id,
            required_from_date: today(),
            urgency_id: urgency.id,
        },
    )
    .await
}

/// Assigns `worker` to a new requirement for its own trade on `project_id`
/// and moves the assignment date `days_ago` into the past. A `completed`
/// assignment finishes on the day it was given.
pub async fn create_aged_assignment(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
    worker: &entities::worker::Model,
    days_ago: i64,
    completed: bool,
) -> Result<entities::worker_assignment::Model> {
    let urgency = catalog
        .urgency_by_code("MEDIUM")
        .ok_or_else(|| Error::not_found("urgency level", "MEDIUM"))?;
    let requirement = assignment::create_requirement(
        db,
        catalog,
        NewRequirement {
            project_id,
            role_id: worker.role_id,
            required_from_date: today(),
            urgency_id: urgency.id,
        },
    )
    .await?;
    let assigned = assignment::assign_worker(db, catalog, requirement.id, worker.id).await?;

    let assigned_date = today() - Duration::days(days_ago);
    let mut active: entities::worker_assignment::ActiveModel = assigned.into();
    active.assigned_date = Set(assigned_date);
    if completed {
        active.completion_date = Set(Some(assigned_date));
    }
    active.update(db).await.map_err(Into::into)
}
