//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`
//! so the schema always matches the Rust structs; the composite uniqueness
//! rules that entity attributes cannot express are added as explicit indexes.

use crate::entities::{
    AdminUser, ConstructionStage, CreditTransactionType, LeadStatus, Project, ProjectActivity,
    ProjectNote, ProjectRevenueTransaction, ProjectStage, ProjectWorkerRequirement,
    RequirementStatus, UrgencyLevel, Worker, WorkerAssignment, WorkerCreditLedger, WorkerProject,
    WorkerRole, project_stage, worker_project,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::debug;

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/leadyard.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the parent directory of a file-backed `SQLite` URL so that
/// `mode=rwc` can create the database file. Other URLs are left alone.
pub fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

fn unique_pair_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("ux_project_stages_project_stage")
            .table(ProjectStage)
            .col(project_stage::Column::ProjectId)
            .col(project_stage::Column::StageId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("ux_worker_projects_worker_project")
            .table(WorkerProject)
            .col(worker_project::Column::WorkerId)
            .col(worker_project::Column::ProjectId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates every table (reference tables first) and the composite unique
/// indexes. Safe to run against an existing database.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table(&schema, ConstructionStage),
        table(&schema, LeadStatus),
        table(&schema, WorkerRole),
        table(&schema, UrgencyLevel),
        table(&schema, RequirementStatus),
        table(&schema, CreditTransactionType),
        table(&schema, Project),
        table(&schema, ProjectStage),
        table(&schema, Worker),
        table(&schema, WorkerProject),
        table(&schema, ProjectWorkerRequirement),
        table(&schema, WorkerAssignment),
        table(&schema, ProjectRevenueTransaction),
        table(&schema, WorkerCreditLedger),
        table(&schema, ProjectActivity),
        table(&schema, ProjectNote),
        table(&schema, AdminUser),
    ];

    for statement in &tables {
        db.execute(builder.build(statement)).await?;
    }
    for index in &unique_pair_indexes() {
        db.execute(builder.build(index)).await?;
    }

    Ok(())
}
