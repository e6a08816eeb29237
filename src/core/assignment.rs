//! Worker matching and requirement assignment.
//!
//! A requirement asks for one trade on one project from a given date. The
//! matcher ranks active workers of that trade; assigning one creates the
//! requirement's single [`worker_assignment`] row.

use crate::{
    core::{
        activity::{self, ActivityKind, ActivityRecord},
        catalog::{ReferenceCatalog, requirement_codes},
        project::get_project,
        round2, today, validation,
        worker::{self, AvailabilityStatus},
    },
    entities::{
        ProjectWorkerRequirement, Worker, WorkerAssignment, project, project_worker_requirement,
        worker as worker_entity, worker_assignment,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Matches scoring below this are not offered.
pub const MIN_MATCH_SCORE: f64 = 40.0;
/// Default number of candidates returned by [`find_best_workers`].
pub const DEFAULT_MATCH_LIMIT: usize = 5;

/// Component scores behind a match, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchBreakdown {
    /// 100 when the worker has the requested trade
    pub role_score: f64,
    /// 100 when the worker is based in the project's postal code
    pub location_score: f64,
    /// From the worker's open assignments
    pub availability_score: f64,
    /// From the worker's lifetime revenue
    pub performance_score: f64,
}

/// Weighted total of a breakdown: role 40%, location 30%, availability 20%,
/// performance 10%.
#[must_use]
pub fn weighted_match_score(breakdown: &MatchBreakdown) -> f64 {
    round2(
        breakdown.role_score * 0.4
            + breakdown.location_score * 0.3
            + breakdown.availability_score * 0.2
            + breakdown.performance_score * 0.1,
    )
}

/// Performance band from lifetime revenue.
#[must_use]
pub fn performance_score(lifetime_revenue: f64) -> f64 {
    if lifetime_revenue < 50_000.0 {
        20.0
    } else if lifetime_revenue < 200_000.0 {
        40.0
    } else if lifetime_revenue < 500_000.0 {
        70.0
    } else {
        100.0
    }
}

/// Scores `worker` against `requirement` on `project`.
pub async fn calculate_match_score(
    db: &DatabaseConnection,
    worker: &worker_entity::Model,
    requirement: &project_worker_requirement::Model,
    project: &project::Model,
) -> Result<(f64, MatchBreakdown)> {
    let scored = score_candidate(db, worker, requirement, project).await?;
    Ok((scored.match_score, scored.breakdown))
}

struct ScoredCandidate {
    match_score: f64,
    breakdown: MatchBreakdown,
    availability: AvailabilityStatus,
    lifetime_revenue: f64,
}

async fn score_candidate(
    db: &DatabaseConnection,
    worker: &worker_entity::Model,
    requirement: &project_worker_requirement::Model,
    project: &project::Model,
) -> Result<ScoredCandidate> {
    let (availability_score, availability) =
        worker::calculate_availability_score(db, worker.id).await?;
    let lifetime_revenue = worker::calculate_worker_revenue(db, worker.id).await?;
    let breakdown = MatchBreakdown {
        role_score: if worker.role_id == requirement.role_id {
            100.0
        } else {
            0.0
        },
        location_score: if worker.primary_pincode == project.pincode {
            100.0
        } else {
            0.0
        },
        availability_score,
        performance_score: performance_score(lifetime_revenue),
    };
    Ok(ScoredCandidate {
        match_score: weighted_match_score(&breakdown),
        breakdown,
        availability,
        lifetime_revenue,
    })
}

/// One ranked candidate for a requirement
#[derive(Debug, Clone)]
pub struct WorkerMatch {
    /// The candidate
    pub worker: worker_entity::Model,
    /// Weighted score
    pub match_score: f64,
    /// Component scores
    pub breakdown: MatchBreakdown,
    /// Availability band
    pub availability: AvailabilityStatus,
    /// Lifetime revenue credited to the worker
    pub lifetime_revenue: f64,
}

async fn get_requirement<C>(db: &C, requirement_id: i64) -> Result<project_worker_requirement::Model>
where
    C: ConnectionTrait,
{
    ProjectWorkerRequirement::find_by_id(requirement_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("requirement", requirement_id))
}

/// Best active workers of the requested trade, highest score first.
///
/// Candidates scoring below [`MIN_MATCH_SCORE`] are dropped and at most
/// `limit` are returned.
#[instrument(skip(db))]
pub async fn find_best_workers(
    db: &DatabaseConnection,
    requirement_id: i64,
    limit: usize,
) -> Result<Vec<WorkerMatch>> {
    let requirement = get_requirement(db, requirement_id).await?;
    let project = get_project(db, requirement.project_id).await?;
    let candidates = Worker::find()
        .filter(worker_entity::Column::ActiveStatus.eq(true))
        .filter(worker_entity::Column::RoleId.eq(requirement.role_id))
        .all(db)
        .await?;

    let mut matches = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let scored = score_candidate(db, &candidate, &requirement, &project).await?;
        if scored.match_score < MIN_MATCH_SCORE {
            continue;
        }
        matches.push(WorkerMatch {
            worker: candidate,
            match_score: scored.match_score,
            breakdown: scored.breakdown,
            availability: scored.availability,
            lifetime_revenue: scored.lifetime_revenue,
        });
    }

    matches.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    matches.truncate(limit);
    debug!(
        "Requirement {} has {} candidate(s)",
        requirement.id,
        matches.len()
    );
    Ok(matches)
}

/// Input for [`create_requirement`]
#[derive(Debug, Clone)]
pub struct NewRequirement {
    /// Project that needs the trade
    pub project_id: i64,
    /// Trade needed
    pub role_id: i64,
    /// Date the worker is needed from
    pub required_from_date: NaiveDate,
    /// Urgency level
    pub urgency_id: i64,
}

/// Opens a requirement for a trade on a project.
#[instrument(skip(db, catalog))]
pub async fn create_requirement(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    new_requirement: NewRequirement,
) -> Result<project_worker_requirement::Model> {
    let open = catalog
        .requirement_status_by_code(requirement_codes::OPEN)
        .ok_or_else(|| Error::ReferenceDataMissing {
            table: "requirement_statuses",
            code: requirement_codes::OPEN.to_string(),
        })?;
    if catalog.role(new_requirement.role_id).is_none() {
        return Err(Error::not_found("worker role", new_requirement.role_id));
    }
    if catalog.urgency(new_requirement.urgency_id).is_none() {
        return Err(Error::not_found("urgency level", new_requirement.urgency_id));
    }
    let project = get_project(db, new_requirement.project_id).await?;

    let requirement = project_worker_requirement::ActiveModel {
        project_id: Set(project.id),
        role_id: Set(new_requirement.role_id),
        required_from_date: Set(new_requirement.required_from_date),
        urgency_id: Set(new_requirement.urgency_id),
        status_id: Set(open.id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(requirement)
}

/// Assigns a worker to a requirement.
///
/// Creates the assignment dated today, moves the requirement to `ASSIGNED`
/// and logs it on the project timeline, all in one transaction. A
/// requirement takes a single assignment; a second attempt fails with
/// [`Error::AlreadyAssigned`].
#[instrument(skip(db, catalog))]
pub async fn assign_worker(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    requirement_id: i64,
    worker_id: i64,
) -> Result<worker_assignment::Model> {
    let assigned = catalog
        .requirement_status_by_code(requirement_codes::ASSIGNED)
        .ok_or_else(|| Error::ReferenceDataMissing {
            table: "requirement_statuses",
            code: requirement_codes::ASSIGNED.to_string(),
        })?;

    let txn = db.begin().await?;
    let requirement = get_requirement(&txn, requirement_id).await?;
    let worker = worker::get_worker(&txn, worker_id).await?;
    if !worker.active_status {
        return Err(Error::Validation {
            field: "worker_id",
            message: format!("worker {} is inactive", worker.worker_code),
        });
    }

    let existing = WorkerAssignment::find()
        .filter(worker_assignment::Column::RequirementId.eq(requirement.id))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(Error::AlreadyAssigned {
            requirement_id: requirement.id,
        });
    }

    let assignment = worker_assignment::ActiveModel {
        requirement_id: Set(requirement.id),
        worker_id: Set(worker.id),
        assigned_date: Set(today()),
        completion_date: Set(None),
        revenue_impact: Set(0.0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let project_id = requirement.project_id;
    let mut active: project_worker_requirement::ActiveModel = requirement.into();
    active.status_id = Set(assigned.id);
    active.update(&txn).await?;

    let role_name = catalog
        .role(worker.role_id)
        .map_or("worker", |role| role.name.as_str());
    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project_id,
            ActivityKind::WorkerAssigned,
            format!("{} ({}) assigned as {role_name}", worker.name, worker.worker_code),
        )
        .with_worker(worker.id),
    )
    .await?;

    txn.commit().await?;
    info!(
        "Assigned worker {} to requirement {}",
        worker.worker_code, assignment.requirement_id
    );
    Ok(assignment)
}

/// Closes an assignment dated today with its revenue impact.
///
/// The requirement moves to `COMPLETED` when that status exists; without
/// it the status is left alone and a warning is logged.
#[instrument(skip(db, catalog))]
pub async fn complete_assignment(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    assignment_id: i64,
    revenue_impact: f64,
) -> Result<worker_assignment::Model> {
    validation::validate_non_negative_amount(revenue_impact)?;

    let txn = db.begin().await?;
    let assignment = WorkerAssignment::find_by_id(assignment_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("assignment", assignment_id))?;
    if assignment.completion_date.is_some() {
        return Err(Error::Validation {
            field: "assignment_id",
            message: format!("assignment {assignment_id} is already completed"),
        });
    }

    let mut active: worker_assignment::ActiveModel = assignment.into();
    active.completion_date = Set(Some(today()));
    active.revenue_impact = Set(revenue_impact);
    let assignment = active.update(&txn).await?;

    let requirement = get_requirement(&txn, assignment.requirement_id).await?;
    let project_id = requirement.project_id;
    match catalog.requirement_status_by_code(requirement_codes::COMPLETED) {
        Some(completed) => {
            let mut active: project_worker_requirement::ActiveModel = requirement.into();
            active.status_id = Set(completed.id);
            active.update(&txn).await?;
        }
        None => warn!(
            "No {} requirement status; requirement {} keeps its status",
            requirement_codes::COMPLETED,
            requirement.id
        ),
    }

    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project_id,
            ActivityKind::AssignmentCompleted,
            format!("Assignment {} completed, revenue impact {revenue_impact:.2}", assignment.id),
        )
        .with_worker(assignment.worker_id),
    )
    .await?;

    txn.commit().await?;
    Ok(assignment)
}

/// Requirements needed within `days_ahead` days (or already overdue) that
/// have no assignment, earliest first.
pub async fn get_unfilled_requirements(
    db: &DatabaseConnection,
    days_ahead: u64,
) -> Result<Vec<project_worker_requirement::Model>> {
    let horizon = today()
        .checked_add_days(chrono::Days::new(days_ahead))
        .unwrap_or(NaiveDate::MAX);
    let assigned: HashSet<i64> = WorkerAssignment::find()
        .all(db)
        .await?
        .into_iter()
        .map(|assignment| assignment.requirement_id)
        .collect();

    let requirements = ProjectWorkerRequirement::find()
        .filter(project_worker_requirement::Column::RequiredFromDate.lte(horizon))
        .order_by_asc(project_worker_requirement::Column::RequiredFromDate)
        .order_by_asc(project_worker_requirement::Column::Id)
        .all(db)
        .await?;
    Ok(requirements
        .into_iter()
        .filter(|requirement| !assigned.contains(&requirement.id))
        .collect())
}

/// Assignments not yet completed.
pub async fn get_active_assignments(
    db: &DatabaseConnection,
) -> Result<Vec<worker_assignment::Model>> {
    WorkerAssignment::find()
        .filter(worker_assignment::Column::CompletionDate.is_null())
        .order_by_asc(worker_assignment::Column::AssignedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fill-rate figures across all requirements
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStatistics {
    /// Requirements ever raised
    pub total_requirements: u64,
    /// Requirements with an assignment
    pub assigned: u64,
    /// Assignments still running
    pub active: u64,
    /// Assignments finished
    pub completed: u64,
    /// Requirements without an assignment
    pub unfilled: u64,
    /// Assigned share of requirements, in percent
    pub fill_rate: f64,
    /// Mean days from requirement creation to assignment, over completed
    /// assignments
    pub average_days_to_assign: Option<f64>,
}

/// Fill-rate figures across all requirements.
pub async fn get_assignment_statistics(db: &DatabaseConnection) -> Result<AssignmentStatistics> {
    let total_requirements = ProjectWorkerRequirement::find().count(db).await?;
    let assignments = WorkerAssignment::find().all(db).await?;
    let assigned = assignments.len() as u64;
    let completed: Vec<&worker_assignment::Model> = assignments
        .iter()
        .filter(|assignment| assignment.completion_date.is_some())
        .collect();
    let active = assigned - completed.len() as u64;

    let created_on: HashMap<i64, NaiveDate> = ProjectWorkerRequirement::find()
        .all(db)
        .await?
        .into_iter()
        .map(|requirement| (requirement.id, requirement.created_at.date_naive()))
        .collect();
    let waits: Vec<i64> = completed
        .iter()
        .filter_map(|assignment| {
            let created = created_on.get(&assignment.requirement_id)?;
            (assignment.assigned_date >= *created)
                .then(|| (assignment.assigned_date - *created).num_days())
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let average_days_to_assign = (!waits.is_empty())
        .then(|| round2(waits.iter().sum::<i64>() as f64 / waits.len() as f64));
    #[allow(clippy::cast_precision_loss)]
    let fill_rate = if total_requirements == 0 {
        0.0
    } else {
        round2(assigned as f64 / total_requirements as f64 * 100.0)
    };

    Ok(AssignmentStatistics {
        total_requirements,
        assigned,
        active,
        completed: completed.len() as u64,
        unfilled: total_requirements.saturating_sub(assigned),
        fill_rate,
        average_days_to_assign,
    })
}
