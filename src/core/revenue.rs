//! Revenue capture and remaining-opportunity analytics.

use crate::{
    core::{catalog::ReferenceCatalog, project::stage_remaining_value, round2, today, validation},
    entities::{
        ProjectRevenueTransaction, ProjectStage, WorkerProject, project,
        project_revenue_transaction, project_stage, worker_project,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Input for [`record_transaction`]
#[derive(Debug, Clone)]
pub struct NewRevenueTransaction {
    /// Project invoiced
    pub project_id: i64,
    /// Construction stage the work belongs to
    pub stage_id: i64,
    /// Worker credited with the revenue, if any
    pub worker_id: Option<i64>,
    /// Invoice reference
    pub invoice_number: String,
    /// Amount invoiced
    pub revenue_amount: f64,
    /// Direct cost of the work
    pub cost_amount: f64,
    /// Margin; `revenue_amount - cost_amount` when `None`
    pub margin_amount: Option<f64>,
    /// Invoice date; today when `None`
    pub transaction_date: Option<NaiveDate>,
}

/// Records an invoice against one stage of a project.
///
/// The stage's captured revenue is incremented in the same transaction, as is
/// the revenue of the worker's link to the project when the invoice names a
/// linked worker. Fails with [`Error::ProjectStageMissing`], writing nothing,
/// when the project has no row for the stage.
#[instrument(skip(db, new_transaction), fields(project_id = new_transaction.project_id, stage_id = new_transaction.stage_id))]
pub async fn record_transaction(
    db: &DatabaseConnection,
    new_transaction: NewRevenueTransaction,
) -> Result<project_revenue_transaction::Model> {
    validation::validate_non_negative_amount(new_transaction.revenue_amount)?;
    validation::validate_non_negative_amount(new_transaction.cost_amount)?;
    if let Some(margin) = new_transaction.margin_amount.filter(|m| !m.is_finite()) {
        return Err(Error::InvalidAmount { amount: margin });
    }
    validation::require_non_empty("invoice_number", &new_transaction.invoice_number)?;

    let txn = db.begin().await?;

    let stage_row = ProjectStage::find()
        .filter(project_stage::Column::ProjectId.eq(new_transaction.project_id))
        .filter(project_stage::Column::StageId.eq(new_transaction.stage_id))
        .one(&txn)
        .await?
        .ok_or(Error::ProjectStageMissing {
            project_id: new_transaction.project_id,
            stage_id: new_transaction.stage_id,
        })?;

    let margin = new_transaction
        .margin_amount
        .unwrap_or(new_transaction.revenue_amount - new_transaction.cost_amount);
    let recorded = project_revenue_transaction::ActiveModel {
        project_id: Set(new_transaction.project_id),
        stage_id: Set(new_transaction.stage_id),
        worker_id: Set(new_transaction.worker_id),
        invoice_number: Set(new_transaction.invoice_number.trim().to_string()),
        revenue_amount: Set(new_transaction.revenue_amount),
        cost_amount: Set(new_transaction.cost_amount),
        margin_amount: Set(round2(margin)),
        transaction_date: Set(new_transaction.transaction_date.unwrap_or_else(today)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    ProjectStage::update_many()
        .col_expr(
            project_stage::Column::CapturedStageRevenue,
            Expr::col(project_stage::Column::CapturedStageRevenue).add(recorded.revenue_amount),
        )
        .filter(project_stage::Column::Id.eq(stage_row.id))
        .exec(&txn)
        .await?;

    if let Some(worker_id) = recorded.worker_id {
        let linked = WorkerProject::update_many()
            .col_expr(
                worker_project::Column::RevenueGenerated,
                Expr::col(worker_project::Column::RevenueGenerated).add(recorded.revenue_amount),
            )
            .filter(worker_project::Column::WorkerId.eq(worker_id))
            .filter(worker_project::Column::ProjectId.eq(recorded.project_id))
            .exec(&txn)
            .await?;
        if linked.rows_affected == 0 {
            debug!("Worker {worker_id} is not linked to project {}", recorded.project_id);
        }
    }

    txn.commit().await?;

    info!(
        "Recorded invoice {} for {:.2} against project {} stage {}",
        recorded.invoice_number, recorded.revenue_amount, recorded.project_id, recorded.stage_id
    );
    Ok(recorded)
}

/// A project's invoices, newest first.
pub async fn get_transactions_for_project(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<Vec<project_revenue_transaction::Model>> {
    ProjectRevenueTransaction::find()
        .filter(project_revenue_transaction::Column::ProjectId.eq(project_id))
        .order_by_desc(project_revenue_transaction::Column::TransactionDate)
        .order_by_desc(project_revenue_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn stage_rows(db: &DatabaseConnection, project_id: i64) -> Result<Vec<project_stage::Model>> {
    ProjectStage::find()
        .filter(project_stage::Column::ProjectId.eq(project_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Estimate still to be captured across all stages of a project.
pub async fn calculate_remaining_opportunity(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<f64> {
    let rows = stage_rows(db, project_id).await?;
    Ok(round2(rows.iter().map(stage_remaining_value).sum()))
}

/// Share of a stage's remaining value still winnable, by its distance from
/// the current stage. Past stages count for nothing.
#[must_use]
pub fn decay_factor(delta: i32) -> f64 {
    match delta {
        0 => 0.5,
        1 => 0.9,
        d if d > 1 => 1.0,
        _ => 0.0,
    }
}

/// Remaining opportunity weighted by [`decay_factor`].
pub async fn calculate_remaining_opportunity_with_decay(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<f64> {
    let project = crate::core::project::get_project(db, project_id).await?;
    let current_sequence = catalog.require_stage(project.current_stage_id)?.sequence_order;

    let mut total = 0.0;
    for row in stage_rows(db, project.id).await? {
        let Some(stage) = catalog.stage(row.stage_id) else {
            continue;
        };
        let factor = decay_factor(stage.sequence_order - current_sequence);
        total += (stage_remaining_value(&row) * factor).max(0.0);
    }
    Ok(round2(total))
}

/// Invoiced revenue as a percentage of the project estimate.
///
/// 0 when the estimate is 0. Not clamped, so over-invoiced projects report
/// more than 100.
pub async fn calculate_capture_ratio(
    db: &DatabaseConnection,
    project: &project::Model,
) -> Result<f64> {
    if project.estimated_total_value == 0.0 {
        return Ok(0.0);
    }
    let captured: f64 = get_transactions_for_project(db, project.id)
        .await?
        .iter()
        .map(|transaction| transaction.revenue_amount)
        .sum();
    Ok(round2(captured / project.estimated_total_value * 100.0))
}

/// True when the project has stages behind its current stage and none of
/// them captured any revenue, meaning the lead arrived after those stages
/// were built by someone else.
pub async fn is_late_entry_project(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project: &project::Model,
) -> Result<bool> {
    let current_sequence = catalog.require_stage(project.current_stage_id)?.sequence_order;
    let past: Vec<project_stage::Model> = stage_rows(db, project.id)
        .await?
        .into_iter()
        .filter(|row| {
            catalog
                .stage(row.stage_id)
                .is_some_and(|stage| stage.sequence_order < current_sequence)
        })
        .collect();
    if past.is_empty() {
        return Ok(false);
    }
    let captured: f64 = past.iter().map(|row| row.captured_stage_revenue).sum();
    Ok(captured == 0.0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::project::{create_project, get_project_stages, update_current_stage};
    use crate::core::worker::add_worker_to_project;
    use crate::test_utils::*;

    fn invoice(project_id: i64, stage_id: i64, revenue: f64) -> NewRevenueTransaction {
        NewRevenueTransaction {
            project_id,
            stage_id,
            worker_id: None,
            invoice_number: format!("INV-{project_id}-{stage_id}"),
            revenue_amount: revenue,
            cost_amount: 0.0,
            margin_amount: None,
            transaction_date: None,
        }
    }

    #[test]
    fn test_decay_factor() {
        assert_eq!(decay_factor(0), 0.5);
        assert_eq!(decay_factor(1), 0.9);
        assert_eq!(decay_factor(6), 1.0);
        assert_eq!(decay_factor(-2), 0.0);
    }

    #[tokio::test]
    async fn test_record_transaction_updates_capture() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();

        let mut input = invoice(project.id, stage_a.id, 50_000.0);
        input.cost_amount = 35_000.0;
        let recorded = record_transaction(&db, input).await?;
        assert_eq!(recorded.margin_amount, 15_000.0);
        assert_eq!(recorded.transaction_date, today());

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert_eq!(rows[0].captured_stage_revenue, 50_000.0);
        assert_eq!(rows[1].captured_stage_revenue, 0.0);
        assert_eq!(calculate_capture_ratio(&db, &project).await?, 5.0);
        assert_eq!(
            calculate_remaining_opportunity(&db, project.id).await?,
            950_000.0
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_record_transaction_without_stage_row() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;

        let result = record_transaction(&db, invoice(project.id, 9_999, 10.0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProjectStageMissing { stage_id: 9_999, .. }
        ));
        assert!(get_transactions_for_project(&db, project.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_revenue_rejected() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000.0).await?;
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();

        let result = record_transaction(&db, invoice(project.id, stage_a.id, -10.0)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_worker_link_revenue_incremented() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;
        let worker = create_test_worker(&db, &catalog, "MASON", "560001").await?;
        let link = add_worker_to_project(&db, worker.id, project.id, worker.role_id, None).await?;
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();

        let mut input = invoice(project.id, stage_a.id, 12_500.0);
        input.worker_id = Some(worker.id);
        record_transaction(&db, input).await?;

        let link = WorkerProject::find_by_id(link.id).one(&db).await?.unwrap();
        assert_eq!(link.revenue_generated, 12_500.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_capture_ratio_zero_estimate() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 0.0).await?;
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();

        record_transaction(&db, invoice(project.id, stage_a.id, 500.0)).await?;
        assert_eq!(calculate_capture_ratio(&db, &project).await?, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_remaining_opportunity_with_decay() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;

        // Current stage A: 375000 * 0.5; next stage B: 625000 * 0.9
        let weighted = calculate_remaining_opportunity_with_decay(&db, &catalog, project.id).await?;
        assert_eq!(weighted, 750_000.0);

        let stage_b = catalog.stage_by_code("STAGE_B").unwrap();
        update_current_stage(&db, &catalog, project.id, stage_b.id, None).await?;
        let weighted = calculate_remaining_opportunity_with_decay(&db, &catalog, project.id).await?;
        assert_eq!(weighted, 312_500.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_late_entry_detection() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let stage_b = catalog.stage_by_code("STAGE_B").unwrap();

        let fresh = create_test_project(&db, &catalog, 1_000.0).await?;
        assert!(!is_late_entry_project(&db, &catalog, &fresh).await?);

        let late = create_project(
            &db,
            &catalog,
            sample_new_project(stage_b.id, new_lead(&catalog), 1_000.0),
        )
        .await?;
        assert!(is_late_entry_project(&db, &catalog, &late).await?);

        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();
        record_transaction(&db, invoice(late.id, stage_a.id, 100.0)).await?;
        assert!(!is_late_entry_project(&db, &catalog, &late).await?);
        Ok(())
    }
}
