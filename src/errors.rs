//! Unified error type for the scoring and ledger engine.

use thiserror::Error;

/// Every failure the engine and the admin commands can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or reference-data file problem
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Field-level validation failure; nothing was written
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Monetary amount that is not finite or has the wrong sign
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Lookup by identifier found nothing
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"project"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Revenue recorded against a (project, stage) pair that has no stage row
    #[error("Project {project_id} has no stage row for stage {stage_id}")]
    ProjectStageMissing {
        /// Project the revenue was recorded against
        project_id: i64,
        /// Construction stage the revenue was recorded against
        stage_id: i64,
    },

    /// A reference-data code the engine depends on is absent from the catalog
    #[error("Reference data missing: {table} code '{code}'")]
    ReferenceDataMissing {
        /// Reference table name
        table: &'static str,
        /// Code that was looked up
        code: String,
    },

    /// The requirement already has its single assignment
    #[error("Requirement {requirement_id} is already assigned")]
    AlreadyAssigned {
        /// Requirement that was targeted
        requirement_id: i64,
    },

    /// Password hashing failed while creating an admin account
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Database failure from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
