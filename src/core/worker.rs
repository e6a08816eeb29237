//! Worker intelligence - revenue, loyalty, availability and reliability.

use crate::{
    core::{
        activity::{self, ActivityKind, ActivityRecord},
        catalog::ReferenceCatalog,
        credit, round2, today, validation,
    },
    entities::{
        Project, ProjectRevenueTransaction, Worker, WorkerAssignment, WorkerCreditLedger,
        WorkerProject, project_revenue_transaction, worker, worker_assignment,
        worker_credit_ledger, worker_project,
    },
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{PaginatorTrait, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Assignments younger than this are not yet expected to be complete.
const RELIABILITY_GRACE_DAYS: u64 = 30;

/// Input for [`create_worker`]
#[derive(Debug, Clone)]
pub struct NewWorker {
    /// Explicit worker code; generated as `WRK-00001` style when `None`
    pub worker_code: Option<String>,
    /// Worker's name
    pub name: String,
    /// Trade
    pub role_id: i64,
    /// Contact phone
    pub phone: String,
    /// Postal code the worker is based in
    pub primary_pincode: String,
    /// Join date; today when `None`
    pub joined_date: Option<NaiveDate>,
}

/// Creates an active worker.
#[instrument(skip(db, catalog, new_worker), fields(name = %new_worker.name))]
pub async fn create_worker(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    new_worker: NewWorker,
) -> Result<worker::Model> {
    validation::require_non_empty("name", &new_worker.name)?;
    validation::validate_phone(&new_worker.phone)?;
    validation::validate_pincode("primary_pincode", &new_worker.primary_pincode)?;
    let role = catalog
        .role(new_worker.role_id)
        .ok_or_else(|| Error::not_found("worker role", new_worker.role_id))?;

    let txn = db.begin().await?;
    let provided_code = new_worker.worker_code.clone();
    let inserted = worker::ActiveModel {
        worker_code: Set(provided_code.clone().unwrap_or_else(|| {
            format!(
                "WRK-PENDING-{}",
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
        })),
        name: Set(new_worker.name.trim().to_string()),
        role_id: Set(role.id),
        phone: Set(new_worker.phone.trim().to_string()),
        primary_pincode: Set(new_worker.primary_pincode.trim().to_string()),
        active_status: Set(true),
        joined_date: Set(new_worker.joined_date.unwrap_or_else(today)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let worker = if provided_code.is_some() {
        inserted
    } else {
        let id = inserted.id;
        let mut active: worker::ActiveModel = inserted.into();
        active.worker_code = Set(format!("WRK-{id:05}"));
        active.update(&txn).await?
    };
    txn.commit().await?;

    info!("Created worker {} ({}) as {}", worker.worker_code, worker.id, role.code);
    Ok(worker)
}

/// Finds a worker by id.
pub async fn get_worker<C>(db: &C, worker_id: i64) -> Result<worker::Model>
where
    C: ConnectionTrait,
{
    Worker::find_by_id(worker_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("worker", worker_id))
}

/// Every active worker.
pub async fn get_active_workers(db: &DatabaseConnection) -> Result<Vec<worker::Model>> {
    Worker::find()
        .filter(worker::Column::ActiveStatus.eq(true))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lifetime revenue of invoices credited to a worker.
pub async fn calculate_worker_revenue(db: &DatabaseConnection, worker_id: i64) -> Result<f64> {
    let total: f64 = ProjectRevenueTransaction::find()
        .filter(project_revenue_transaction::Column::WorkerId.eq(worker_id))
        .all(db)
        .await?
        .iter()
        .map(|transaction| transaction.revenue_amount)
        .sum();
    Ok(round2(total))
}

/// Project links this worker brought in by referral, as a percentage of the
/// worker's own project links. 0 for a worker on no projects.
pub async fn calculate_loyalty_score(db: &DatabaseConnection, worker_id: i64) -> Result<f64> {
    let own_links = WorkerProject::find()
        .filter(worker_project::Column::WorkerId.eq(worker_id))
        .count(db)
        .await?;
    if own_links == 0 {
        return Ok(0.0);
    }
    let referred = WorkerProject::find()
        .filter(worker_project::Column::ReferredByWorkerId.eq(worker_id))
        .count(db)
        .await?;
    #[allow(clippy::cast_precision_loss)]
    let share = referred as f64 / own_links as f64 * 100.0;
    Ok(round2(share))
}

/// Availability band by number of unfinished assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityStatus {
    /// No open assignments
    Available,
    /// One open assignment
    PartiallyAvailable,
    /// Two open assignments
    Busy,
    /// Three or more
    Overloaded,
}

impl AvailabilityStatus {
    /// Band for an open-assignment count.
    #[must_use]
    pub const fn from_open_assignments(open: u64) -> Self {
        match open {
            0 => Self::Available,
            1 => Self::PartiallyAvailable,
            2 => Self::Busy,
            _ => Self::Overloaded,
        }
    }

    /// Score used by the matcher.
    #[must_use]
    pub const fn score(self) -> f64 {
        match self {
            Self::Available => 100.0,
            Self::PartiallyAvailable => 70.0,
            Self::Busy => 40.0,
            Self::Overloaded => 10.0,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::PartiallyAvailable => "Partially Available",
            Self::Busy => "Busy",
            Self::Overloaded => "Overloaded",
        }
    }
}

/// Availability score and band from the worker's open assignments.
pub async fn calculate_availability_score(
    db: &DatabaseConnection,
    worker_id: i64,
) -> Result<(f64, AvailabilityStatus)> {
    let open = WorkerAssignment::find()
        .filter(worker_assignment::Column::WorkerId.eq(worker_id))
        .filter(worker_assignment::Column::CompletionDate.is_null())
        .count(db)
        .await?;
    let status = AvailabilityStatus::from_open_assignments(open);
    Ok((status.score(), status))
}

/// Weighted blend of the completion and payment components, each in `[0, 100]`.
#[must_use]
pub fn reliability_score(completion_rate: f64, payment_rate: f64) -> f64 {
    round2(0.6 * completion_rate + 0.4 * payment_rate)
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        100.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Reliability score in `[0, 100]`.
///
/// Completion covers assignments given at least 30 days ago; payment covers
/// due-dated debits that are settled or already past due. A component with
/// nothing to measure counts as 100.
pub async fn calculate_reliability_score(db: &DatabaseConnection, worker_id: i64) -> Result<f64> {
    let now = today();
    let cutoff = now
        .checked_sub_days(Days::new(RELIABILITY_GRACE_DAYS))
        .unwrap_or(now);

    let aged = WorkerAssignment::find()
        .filter(worker_assignment::Column::WorkerId.eq(worker_id))
        .filter(worker_assignment::Column::AssignedDate.lte(cutoff))
        .all(db)
        .await?;
    let completed = aged.iter().filter(|a| a.completion_date.is_some()).count();

    let due_entries: Vec<worker_credit_ledger::Model> = WorkerCreditLedger::find()
        .filter(worker_credit_ledger::Column::WorkerId.eq(worker_id))
        .filter(worker_credit_ledger::Column::Debit.gt(0.0))
        .filter(worker_credit_ledger::Column::DueDate.is_not_null())
        .all(db)
        .await?
        .into_iter()
        .filter(|entry| entry.is_settled || entry.due_date.is_some_and(|due| due < now))
        .collect();
    let settled = due_entries.iter().filter(|entry| entry.is_settled).count();

    Ok(reliability_score(
        percentage(completed, aged.len()),
        percentage(settled, due_entries.len()),
    ))
}

/// Links a worker to a project, optionally crediting the worker who
/// referred them, and logs it on the project timeline.
#[instrument(skip(db))]
pub async fn add_worker_to_project(
    db: &DatabaseConnection,
    worker_id: i64,
    project_id: i64,
    role_id: i64,
    referred_by_worker_id: Option<i64>,
) -> Result<worker_project::Model> {
    if referred_by_worker_id == Some(worker_id) {
        return Err(Error::Validation {
            field: "referred_by_worker_id",
            message: "a worker cannot refer themselves".to_string(),
        });
    }

    let txn = db.begin().await?;
    let worker = get_worker(&txn, worker_id).await?;
    let project = Project::find_by_id(project_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("project", project_id))?;
    if let Some(referrer) = referred_by_worker_id {
        get_worker(&txn, referrer).await?;
    }

    let already_linked = WorkerProject::find()
        .filter(worker_project::Column::WorkerId.eq(worker.id))
        .filter(worker_project::Column::ProjectId.eq(project.id))
        .count(&txn)
        .await?
        > 0;
    if already_linked {
        return Err(Error::Validation {
            field: "worker_id",
            message: format!("worker {} is already on project {}", worker.id, project.id),
        });
    }

    let link = worker_project::ActiveModel {
        worker_id: Set(worker.id),
        project_id: Set(project.id),
        role_id: Set(role_id),
        revenue_generated: Set(0.0),
        referred_by_worker_id: Set(referred_by_worker_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project.id,
            ActivityKind::WorkerAssigned,
            format!("Worker {} ({}) added to project", worker.name, worker.worker_code),
        )
        .with_worker(worker.id),
    )
    .await?;

    txn.commit().await?;
    Ok(link)
}

/// Removes a worker's link to a project. Returns `false` when there was none.
#[instrument(skip(db))]
pub async fn remove_worker_from_project(
    db: &DatabaseConnection,
    worker_id: i64,
    project_id: i64,
) -> Result<bool> {
    let txn = db.begin().await?;
    let worker = get_worker(&txn, worker_id).await?;

    let removed = WorkerProject::delete_many()
        .filter(worker_project::Column::WorkerId.eq(worker.id))
        .filter(worker_project::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await?
        .rows_affected;
    if removed == 0 {
        return Ok(false);
    }

    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project_id,
            ActivityKind::WorkerRemoved,
            format!("Worker {} ({}) removed from project", worker.name, worker.worker_code),
        )
        .with_worker(worker.id),
    )
    .await?;

    txn.commit().await?;
    Ok(true)
}

/// Everything known about one worker's track record
#[derive(Debug, Clone)]
pub struct WorkerPerformance {
    /// The worker
    pub worker: worker::Model,
    /// Lifetime invoiced revenue credited to the worker
    pub lifetime_revenue: f64,
    /// Referral share, in percent
    pub loyalty_score: f64,
    /// Availability score
    pub availability_score: f64,
    /// Availability band
    pub availability: AvailabilityStatus,
    /// Reliability score
    pub reliability_score: f64,
    /// Projects the worker is linked to
    pub project_count: u64,
    /// Assignments finished
    pub completed_assignments: u64,
    /// Latest ledger balance
    pub current_balance: f64,
}

/// Performance summary for one worker.
pub async fn get_worker_performance_summary(
    db: &DatabaseConnection,
    worker_id: i64,
) -> Result<WorkerPerformance> {
    let worker = get_worker(db, worker_id).await?;
    let (availability_score, availability) = calculate_availability_score(db, worker.id).await?;
    let project_count = WorkerProject::find()
        .filter(worker_project::Column::WorkerId.eq(worker.id))
        .count(db)
        .await?;
    let completed_assignments = WorkerAssignment::find()
        .filter(worker_assignment::Column::WorkerId.eq(worker.id))
        .filter(worker_assignment::Column::CompletionDate.is_not_null())
        .count(db)
        .await?;

    Ok(WorkerPerformance {
        lifetime_revenue: calculate_worker_revenue(db, worker.id).await?,
        loyalty_score: calculate_loyalty_score(db, worker.id).await?,
        reliability_score: calculate_reliability_score(db, worker.id).await?,
        current_balance: credit::get_worker_current_balance(db, worker.id).await?,
        availability_score,
        availability,
        project_count,
        completed_assignments,
        worker,
    })
}

/// Active workers with the highest lifetime revenue, best first.
pub async fn get_top_performers(
    db: &DatabaseConnection,
    limit: usize,
) -> Result<Vec<WorkerPerformance>> {
    let mut summaries = Vec::new();
    for worker in get_active_workers(db).await? {
        summaries.push(get_worker_performance_summary(db, worker.id).await?);
    }
    summaries.sort_by(|a, b| b.lifetime_revenue.total_cmp(&a.lifetime_revenue));
    summaries.truncate(limit);
    Ok(summaries)
}
