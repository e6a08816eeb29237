//! Core business logic - the scoring, allocation and ledger engines.
//!
//! Every function here is framework-agnostic: it takes a `SeaORM` connection
//! (and the [`catalog::ReferenceCatalog`] where reference data is needed) and
//! returns typed results. Operations that write more than one row run inside
//! a single database transaction.

/// Project timeline entries and notes
pub mod activity;
/// Administrative account bootstrap
pub mod admin;
/// Cross-project revenue analytics and dashboards
pub mod analytics;
/// Worker requirements, matching and assignment
pub mod assignment;
/// Dated project events and deadline counts
pub mod calendar;
/// In-memory reference data catalog
pub mod catalog;
/// Worker credit ledger and risk assessment
pub mod credit;
/// Reference data seeding
pub mod master_data;
/// Project creation, stage allocation and stage priority
pub mod project;
/// Revenue capture and opportunity analytics
pub mod revenue;
/// Field validation shared by the create operations
pub mod validation;
/// Worker records and worker scores
pub mod worker;

use chrono::{NaiveDate, Utc};

/// Rounds a score or currency amount to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The current business date (UTC).
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
