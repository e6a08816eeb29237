//! Portfolio-level reporting over projects, stages and invoices.

use crate::{
    core::{
        catalog::ReferenceCatalog,
        project::{get_project, predict_remaining_stages},
        revenue::{
            calculate_capture_ratio, calculate_remaining_opportunity,
            calculate_remaining_opportunity_with_decay, get_transactions_for_project,
        },
        round2,
    },
    entities::{
        Project, ProjectRevenueTransaction, ProjectStage, Worker, WorkerProject, project,
        worker_project,
    },
    errors::Result,
};
use sea_orm::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Headline figures for one project
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    /// The project
    pub project: project::Model,
    /// Estimate not yet captured
    pub remaining_opportunity: f64,
    /// Remaining opportunity weighted by distance from the current stage
    pub remaining_opportunity_decay: f64,
    /// Invoiced share of the estimate, in percent
    pub capture_ratio: f64,
    /// Sum of invoiced revenue
    pub total_captured: f64,
    /// Number of invoices
    pub transaction_count: usize,
    /// Distinct workers linked to the project
    pub worker_count: usize,
    /// Stages still ahead
    pub remaining_stages: usize,
}

/// Headline figures for one project.
pub async fn get_project_summary(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<ProjectSummary> {
    let project = get_project(db, project_id).await?;
    let transactions = get_transactions_for_project(db, project.id).await?;
    let workers: HashSet<i64> = WorkerProject::find()
        .filter(worker_project::Column::ProjectId.eq(project.id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.worker_id)
        .collect();

    Ok(ProjectSummary {
        remaining_opportunity: calculate_remaining_opportunity(db, project.id).await?,
        remaining_opportunity_decay: calculate_remaining_opportunity_with_decay(
            db, catalog, project.id,
        )
        .await?,
        capture_ratio: calculate_capture_ratio(db, &project).await?,
        total_captured: round2(transactions.iter().map(|t| t.revenue_amount).sum()),
        transaction_count: transactions.len(),
        worker_count: workers.len(),
        remaining_stages: predict_remaining_stages(catalog, &project)?.len(),
        project,
    })
}

/// A project with a large uncaptured estimate
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// The project
    pub project: project::Model,
    /// Estimate not yet captured
    pub remaining_opportunity: f64,
    /// Invoiced share of the estimate, in percent
    pub capture_ratio: f64,
}

/// Active projects not yet won whose remaining opportunity is at least
/// `min_opportunity`, largest first.
pub async fn get_high_value_opportunities(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    min_opportunity: f64,
    limit: usize,
) -> Result<Vec<Opportunity>> {
    let projects = Project::find()
        .filter(project::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let mut opportunities = Vec::new();
    for project in projects {
        let won = catalog
            .lead_status(project.lead_status_id)
            .is_some_and(|status| status.is_won);
        if won {
            continue;
        }
        let remaining = calculate_remaining_opportunity(db, project.id).await?;
        if remaining < min_opportunity {
            continue;
        }
        opportunities.push(Opportunity {
            capture_ratio: calculate_capture_ratio(db, &project).await?,
            remaining_opportunity: remaining,
            project,
        });
    }

    opportunities.sort_by(|a, b| b.remaining_opportunity.total_cmp(&a.remaining_opportunity));
    opportunities.truncate(limit);
    Ok(opportunities)
}

/// Invoiced revenue for one postal code
#[derive(Debug, Clone, PartialEq)]
pub struct PincodeRevenue {
    /// Project postal code
    pub pincode: String,
    /// Invoiced revenue
    pub total_revenue: f64,
}

/// Invoiced revenue grouped by project postal code, largest first.
pub async fn revenue_per_pincode(db: &DatabaseConnection) -> Result<Vec<PincodeRevenue>> {
    let pincodes: HashMap<i64, String> = Project::find()
        .all(db)
        .await?
        .into_iter()
        .map(|project| (project.id, project.pincode))
        .collect();

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for transaction in ProjectRevenueTransaction::find().all(db).await? {
        if let Some(pincode) = pincodes.get(&transaction.project_id) {
            *totals.entry(pincode.clone()).or_default() += transaction.revenue_amount;
        }
    }

    let mut rows: Vec<PincodeRevenue> = totals
        .into_iter()
        .map(|(pincode, total)| PincodeRevenue {
            pincode,
            total_revenue: round2(total),
        })
        .collect();
    rows.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    Ok(rows)
}

/// Estimate and capture for one construction stage across all projects
#[derive(Debug, Clone, PartialEq)]
pub struct StageRevenue {
    /// Stage code
    pub stage_code: String,
    /// Stage name
    pub stage_name: String,
    /// Sum of stage estimates
    pub estimated: f64,
    /// Sum of captured revenue
    pub captured: f64,
    /// Captured share of the estimate, in percent
    pub capture_ratio: f64,
}

/// Estimate and capture per construction stage, in construction order.
pub async fn revenue_per_stage(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
) -> Result<Vec<StageRevenue>> {
    let mut sums: HashMap<i64, (f64, f64)> = HashMap::new();
    for row in ProjectStage::find().all(db).await? {
        let entry = sums.entry(row.stage_id).or_default();
        entry.0 += row.estimated_stage_value;
        entry.1 += row.captured_stage_revenue;
    }

    Ok(catalog
        .stages()
        .iter()
        .map(|stage| {
            let (estimated, captured) = sums.get(&stage.id).copied().unwrap_or_default();
            StageRevenue {
                stage_code: stage.code.clone(),
                stage_name: stage.name.clone(),
                estimated: round2(estimated),
                captured: round2(captured),
                capture_ratio: if estimated == 0.0 {
                    0.0
                } else {
                    round2(captured / estimated * 100.0)
                },
            }
        })
        .collect())
}

/// Invoiced revenue credited to one worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerRevenue {
    /// Worker id
    pub worker_id: i64,
    /// Worker's name
    pub worker_name: String,
    /// Invoiced revenue
    pub total_revenue: f64,
}

/// Workers ranked by invoiced revenue credited to them.
pub async fn top_workers_by_revenue(
    db: &DatabaseConnection,
    limit: usize,
) -> Result<Vec<WorkerRevenue>> {
    let mut totals: HashMap<i64, f64> = HashMap::new();
    for transaction in ProjectRevenueTransaction::find().all(db).await? {
        if let Some(worker_id) = transaction.worker_id {
            *totals.entry(worker_id).or_default() += transaction.revenue_amount;
        }
    }

    let names: HashMap<i64, String> = Worker::find()
        .all(db)
        .await?
        .into_iter()
        .map(|worker| (worker.id, worker.name))
        .collect();
    let mut rows: Vec<WorkerRevenue> = totals
        .into_iter()
        .map(|(worker_id, total)| WorkerRevenue {
            worker_id,
            worker_name: names.get(&worker_id).cloned().unwrap_or_default(),
            total_revenue: round2(total),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then(a.worker_id.cmp(&b.worker_id))
    });
    rows.truncate(limit);
    Ok(rows)
}
