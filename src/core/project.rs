//! Project business logic - creation, stage allocation and stage priority.
//!
//! A project's estimate is split across every active construction stage in
//! proportion to the stage's priority weight when the project is created.
//! As the site moves forward, past stages are closed off and the remaining
//! stages are re-ranked by how urgently they need attention.

use crate::{
    core::{
        activity::{self, ActivityKind, ActivityRecord},
        catalog::ReferenceCatalog,
        round2, today, validation,
    },
    entities::{Project, ProjectStage, construction_stage, project, project_stage},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Margin applied to every stage when the estimate cannot be split.
const DEFAULT_MARGIN_PERCENTAGE: f64 = 20.0;
/// Remaining value at which the revenue-opportunity component saturates.
const REVENUE_OPPORTUNITY_CEILING: f64 = 100_000.0;
/// Margin at which the margin component saturates.
const MARGIN_CEILING: f64 = 30.0;

const POSITION_WEIGHT: f64 = 0.40;
const REVENUE_WEIGHT: f64 = 0.25;
const MARGIN_WEIGHT: f64 = 0.20;
const CAPTURE_WEIGHT: f64 = 0.15;

/// Input for [`create_project`]
#[derive(Debug, Clone)]
pub struct NewProject {
    /// Explicit project code; generated as `PRJ-00001` style when `None`
    pub project_code: Option<String>,
    /// Project name
    pub name: String,
    /// Client's name
    pub client_name: String,
    /// Client's phone
    pub phone: Option<String>,
    /// Site address
    pub full_address: String,
    /// Site postal code
    pub pincode: String,
    /// Site city
    pub city: String,
    /// Site latitude
    pub latitude: Option<f64>,
    /// Site longitude
    pub longitude: Option<f64>,
    /// Total estimate to split across stages
    pub estimated_total_value: f64,
    /// Stage the site is in when entered
    pub current_stage_id: i64,
    /// Pipeline status when entered
    pub lead_status_id: i64,
    /// Expected handover date
    pub expected_completion_date: Option<NaiveDate>,
}

impl NewProject {
    fn validate(&self) -> Result<()> {
        validation::require_non_empty("name", &self.name)?;
        validation::require_non_empty("client_name", &self.client_name)?;
        validation::validate_pincode("pincode", &self.pincode)?;
        if let Some(phone) = &self.phone {
            validation::validate_phone(phone)?;
        }
        validation::validate_non_negative_amount(self.estimated_total_value)
    }
}

/// Estimated value and expected margin for one stage.
///
/// The value is the stage's weight-proportional share of `total_value`; the
/// margin is 15% plus 1.5 points per unit of weight, reaching 30% at the
/// largest accepted weight of 10. When nothing can be
/// split (zero total weight or zero value) the share is 0 at a 20% margin.
#[must_use]
pub fn stage_allocation(total_value: f64, weight: i32, total_weight: i32) -> (f64, f64) {
    if total_weight <= 0 || total_value <= 0.0 {
        return (0.0, DEFAULT_MARGIN_PERCENTAGE);
    }
    let weight = f64::from(weight);
    let value = round2(total_value * (weight / f64::from(total_weight)));
    let margin = round2(15.0 + (weight / 10.0) * 15.0);
    (value, margin)
}

fn total_active_weight(catalog: &ReferenceCatalog) -> i32 {
    catalog
        .active_stages()
        .map(|stage| stage.default_margin_priority)
        .sum()
}

/// Creates a project together with one stage row per active construction stage.
///
/// Stage rows are seeded in sequence order with their share of the estimate
/// (see [`stage_allocation`]). The project, its stage rows and the `CREATED`
/// timeline entry are written in one transaction.
#[instrument(skip(db, catalog, new_project), fields(name = %new_project.name))]
pub async fn create_project(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    new_project: NewProject,
) -> Result<project::Model> {
    new_project.validate()?;
    catalog.require_stage(new_project.current_stage_id)?;
    if catalog.lead_status(new_project.lead_status_id).is_none() {
        return Err(Error::not_found("lead status", new_project.lead_status_id));
    }

    let txn = db.begin().await?;

    let provided_code = new_project.project_code.clone();
    let placeholder_code = format!(
        "PRJ-PENDING-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    let inserted = project::ActiveModel {
        project_code: Set(provided_code.clone().unwrap_or(placeholder_code)),
        name: Set(new_project.name.trim().to_string()),
        client_name: Set(new_project.client_name.trim().to_string()),
        phone: Set(new_project.phone.map(|p| p.trim().to_string())),
        full_address: Set(new_project.full_address.trim().to_string()),
        pincode: Set(new_project.pincode.trim().to_string()),
        city: Set(new_project.city.trim().to_string()),
        latitude: Set(new_project.latitude),
        longitude: Set(new_project.longitude),
        estimated_total_value: Set(new_project.estimated_total_value),
        current_stage_id: Set(new_project.current_stage_id),
        lead_status_id: Set(new_project.lead_status_id),
        expected_completion_date: Set(new_project.expected_completion_date),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let project = if provided_code.is_some() {
        inserted
    } else {
        let id = inserted.id;
        let mut active: project::ActiveModel = inserted.into();
        active.project_code = Set(format!("PRJ-{id:05}"));
        active.update(&txn).await?
    };

    let total_weight = total_active_weight(catalog);
    let mut seeded = 0_usize;
    for stage in catalog.active_stages() {
        let (value, margin) = stage_allocation(
            project.estimated_total_value,
            stage.default_margin_priority,
            total_weight,
        );
        project_stage::ActiveModel {
            project_id: Set(project.id),
            stage_id: Set(stage.id),
            estimated_stage_value: Set(value),
            captured_stage_revenue: Set(0.0),
            expected_margin_percentage: Set(margin),
            is_completed: Set(false),
            completion_date: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        seeded += 1;
    }

    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project.id,
            ActivityKind::Created,
            format!(
                "Project '{}' created with code {}",
                project.name, project.project_code
            ),
        ),
    )
    .await?;

    txn.commit().await?;

    info!(
        "Created project {} ({}) with {} stage rows, estimate {:.2}",
        project.project_code, project.id, seeded, project.estimated_total_value
    );
    Ok(project)
}

/// Finds a project by id.
pub async fn get_project<C>(db: &C, project_id: i64) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    Project::find_by_id(project_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("project", project_id))
}

/// Finds a project by its code.
pub async fn get_project_by_code(
    db: &DatabaseConnection,
    project_code: &str,
) -> Result<Option<project::Model>> {
    Project::find()
        .filter(project::Column::ProjectCode.eq(project_code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Stage rows of a project, in construction sequence.
pub async fn get_project_stages<C>(
    db: &C,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<Vec<project_stage::Model>>
where
    C: ConnectionTrait,
{
    let mut rows = ProjectStage::find()
        .filter(project_stage::Column::ProjectId.eq(project_id))
        .all(db)
        .await?;
    rows.sort_by_key(|row| {
        catalog
            .stage(row.stage_id)
            .map_or(i32::MAX, |stage| stage.sequence_order)
    });
    Ok(rows)
}

/// Re-splits the estimate over a project's stage rows without touching
/// values that were already set.
///
/// A row's estimated value is written only while it is still zero, and its
/// margin likewise, so manual edits survive. Returns `false` when there is
/// nothing to split: the project has no estimate or the stages have no
/// total weight.
#[instrument(skip(db, catalog))]
pub async fn recalculate_project_stage_estimates(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<bool> {
    let project = get_project(db, project_id).await?;
    let total_weight = total_active_weight(catalog);
    if project.estimated_total_value <= 0.0 || total_weight <= 0 {
        debug!(
            "Nothing to recalculate for project {}: estimate {:.2}, weight {}",
            project.id, project.estimated_total_value, total_weight
        );
        return Ok(false);
    }

    let txn = db.begin().await?;
    let rows = ProjectStage::find()
        .filter(project_stage::Column::ProjectId.eq(project.id))
        .all(&txn)
        .await?;

    let mut updated = 0_usize;
    for row in rows {
        let Some(stage) = catalog.stage(row.stage_id).filter(|stage| stage.is_active) else {
            continue;
        };
        let (value, margin) = stage_allocation(
            project.estimated_total_value,
            stage.default_margin_priority,
            total_weight,
        );
        let fill_value = row.estimated_stage_value == 0.0;
        let fill_margin = row.expected_margin_percentage == 0.0;
        if !fill_value && !fill_margin {
            continue;
        }

        let mut active: project_stage::ActiveModel = row.into();
        if fill_value {
            active.estimated_stage_value = Set(value);
        }
        if fill_margin {
            active.expected_margin_percentage = Set(margin);
        }
        active.update(&txn).await?;
        updated += 1;
    }

    txn.commit().await?;
    info!(
        "Recalculated stage estimates for project {}: {} rows filled",
        project.id, updated
    );
    Ok(true)
}

/// Marks every incomplete stage before `project`'s current stage as completed
/// today, on the given connection. Returns the number of rows changed.
pub async fn mark_past_stages_completed_on<C>(
    db: &C,
    catalog: &ReferenceCatalog,
    project: &project::Model,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let current_sequence = catalog.require_stage(project.current_stage_id)?.sequence_order;
    let past_stage_ids: Vec<i64> = catalog
        .stages()
        .iter()
        .filter(|stage| stage.sequence_order < current_sequence)
        .map(|stage| stage.id)
        .collect();
    if past_stage_ids.is_empty() {
        return Ok(0);
    }

    let result = ProjectStage::update_many()
        .col_expr(project_stage::Column::IsCompleted, Expr::value(true))
        .col_expr(project_stage::Column::CompletionDate, Expr::value(today()))
        .filter(project_stage::Column::ProjectId.eq(project.id))
        .filter(project_stage::Column::StageId.is_in(past_stage_ids))
        .filter(project_stage::Column::IsCompleted.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Marks every incomplete stage before the project's current stage as
/// completed today and returns how many rows changed.
///
/// Running it again straight away changes nothing; the current stage and
/// later stages are never touched.
#[instrument(skip(db, catalog))]
pub async fn mark_past_stages_completed(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<u64> {
    let project = get_project(db, project_id).await?;
    let changed = mark_past_stages_completed_on(db, catalog, &project).await?;
    debug!("Marked {changed} past stages completed for project {project_id}");
    Ok(changed)
}

/// Moves a project to a new construction stage, closes off every stage it
/// has passed, and logs the change.
#[instrument(skip(db, catalog, notes))]
pub async fn update_current_stage(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
    new_stage_id: i64,
    notes: Option<&str>,
) -> Result<project::Model> {
    let new_stage = catalog.require_stage(new_stage_id)?;
    let txn = db.begin().await?;

    let project = get_project(&txn, project_id).await?;
    let old_stage_name = catalog
        .stage(project.current_stage_id)
        .map_or_else(String::new, |stage| stage.name.clone());

    let mut active: project::ActiveModel = project.into();
    active.current_stage_id = Set(new_stage.id);
    let project = active.update(&txn).await?;

    let completed = mark_past_stages_completed_on(&txn, catalog, &project).await?;

    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project.id,
            ActivityKind::StageChange,
            activity::with_notes(
                format!(
                    "Construction stage changed from '{old_stage_name}' to '{}'",
                    new_stage.name
                ),
                notes,
            ),
        )
        .with_change(&old_stage_name, &new_stage.name),
    )
    .await?;

    txn.commit().await?;
    info!(
        "Project {} moved to stage {} ({} past stages closed)",
        project.id, new_stage.code, completed
    );
    Ok(project)
}

/// Moves a project to a new lead status and logs it as won, lost or a plain
/// status change.
#[instrument(skip(db, catalog, notes))]
pub async fn update_lead_status(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
    new_status_id: i64,
    notes: Option<&str>,
) -> Result<project::Model> {
    let new_status = catalog
        .lead_status(new_status_id)
        .ok_or_else(|| Error::not_found("lead status", new_status_id))?;
    let txn = db.begin().await?;

    let project = get_project(&txn, project_id).await?;
    let old_status_name = catalog
        .lead_status(project.lead_status_id)
        .map_or_else(String::new, |status| status.name.clone());

    let mut active: project::ActiveModel = project.into();
    active.lead_status_id = Set(new_status.id);
    let project = active.update(&txn).await?;

    let kind = if new_status.is_won {
        ActivityKind::ProjectWon
    } else if new_status.is_lost {
        ActivityKind::ProjectLost
    } else {
        ActivityKind::StatusChange
    };
    activity::log_activity(
        &txn,
        ActivityRecord::new(
            project.id,
            kind,
            activity::with_notes(
                format!(
                    "Lead status changed from '{old_status_name}' to '{}'",
                    new_status.name
                ),
                notes,
            ),
        )
        .with_change(&old_status_name, &new_status.name),
    )
    .await?;

    txn.commit().await?;
    Ok(project)
}

/// Active stages still ahead of the project's current stage, in sequence.
pub fn predict_remaining_stages<'a>(
    catalog: &'a ReferenceCatalog,
    project: &project::Model,
) -> Result<Vec<&'a construction_stage::Model>> {
    let current_sequence = catalog.require_stage(project.current_stage_id)?.sequence_order;
    Ok(catalog
        .active_stages()
        .filter(|stage| stage.sequence_order > current_sequence)
        .collect())
}

/// Captured share of a stage's estimate, in percent; 0 when the stage has
/// no estimate.
#[must_use]
pub fn stage_capture_ratio(row: &project_stage::Model) -> f64 {
    if row.estimated_stage_value == 0.0 {
        return 0.0;
    }
    round2(row.captured_stage_revenue / row.estimated_stage_value * 100.0)
}

/// Estimate not yet captured, never negative.
#[must_use]
pub fn stage_remaining_value(row: &project_stage::Model) -> f64 {
    (row.estimated_stage_value - row.captured_stage_revenue).max(0.0)
}

/// Position component of the stage priority score.
///
/// `delta` is the stage's sequence minus the current stage's sequence.
#[must_use]
pub fn position_score(delta: i32, is_completed: bool) -> f64 {
    match delta {
        0 => 100.0,
        1 => 85.0,
        2 => 70.0,
        3 | 4 => 50.0,
        d if d > 4 => 25.0,
        _ if is_completed => 10.0,
        _ => 40.0,
    }
}

/// Priority score in `[0, 100]` for one stage row whose stage sits `delta`
/// positions from the current stage.
#[must_use]
pub fn stage_priority_score(row: &project_stage::Model, delta: i32) -> f64 {
    let position = position_score(delta, row.is_completed);
    let revenue_opportunity =
        (stage_remaining_value(row) / REVENUE_OPPORTUNITY_CEILING * 100.0).min(100.0);
    let margin = (row.expected_margin_percentage / MARGIN_CEILING * 100.0).min(100.0);
    let capture_gap = (100.0 - stage_capture_ratio(row)).max(0.0);
    let capture_urgency = if row.is_completed {
        capture_gap * 0.5
    } else {
        capture_gap
    };

    round2(
        position * POSITION_WEIGHT
            + revenue_opportunity * REVENUE_WEIGHT
            + margin * MARGIN_WEIGHT
            + capture_urgency * CAPTURE_WEIGHT,
    )
}

fn sequence_delta(
    catalog: &ReferenceCatalog,
    project: &project::Model,
    stage_id: i64,
) -> Result<i32> {
    let current = catalog.require_stage(project.current_stage_id)?.sequence_order;
    let stage = catalog.require_stage(stage_id)?.sequence_order;
    Ok(stage - current)
}

/// Priority score of one stage of a project; 0 when the project has no row
/// for that stage.
pub async fn calculate_stage_priority_score(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project: &project::Model,
    stage_id: i64,
) -> Result<f64> {
    let Some(row) = ProjectStage::find()
        .filter(project_stage::Column::ProjectId.eq(project.id))
        .filter(project_stage::Column::StageId.eq(stage_id))
        .one(db)
        .await?
    else {
        return Ok(0.0);
    };
    let delta = sequence_delta(catalog, project, stage_id)?;
    Ok(stage_priority_score(&row, delta))
}

/// Urgency band of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageUrgency {
    /// Score 80 and above
    Critical,
    /// Score 60 to 80
    High,
    /// Score 40 to 60
    Medium,
    /// Score below 40
    Low,
    /// Finished on site but value is still uncaptured
    FollowUp,
    /// Finished and fully captured
    Completed,
}

impl StageUrgency {
    /// Band for a stage row and its score.
    #[must_use]
    pub fn classify(row: &project_stage::Model, score: f64) -> Self {
        if row.is_completed {
            if stage_remaining_value(row) > 0.0 {
                Self::FollowUp
            } else {
                Self::Completed
            }
        } else if score >= 80.0 {
            Self::Critical
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::FollowUp => "Follow-up",
            Self::Completed => "Completed",
        }
    }

    /// Display colour name.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Critical => "danger",
            Self::High => "warning",
            Self::Medium => "info",
            Self::Low => "secondary",
            Self::FollowUp => "primary",
            Self::Completed => "success",
        }
    }
}

/// Where a stage sits relative to the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePosition {
    /// The current stage
    Current,
    /// One ahead
    Next,
    /// Two ahead
    NextPlusOne,
    /// Three or more ahead
    Future,
    /// Behind and not yet marked completed
    PastIncomplete,
    /// Behind and completed
    Completed,
}

impl StagePosition {
    /// Position for a sequence delta and completion flag.
    #[must_use]
    pub const fn classify(delta: i32, is_completed: bool) -> Self {
        match delta {
            0 => Self::Current,
            1 => Self::Next,
            2 => Self::NextPlusOne,
            d if d > 2 => Self::Future,
            _ if is_completed => Self::Completed,
            _ => Self::PastIncomplete,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Next => "Next",
            Self::NextPlusOne => "Next+1",
            Self::Future => "Future",
            Self::PastIncomplete => "Past (Incomplete)",
            Self::Completed => "Completed",
        }
    }
}

/// Recommended next step for a stage.
#[must_use]
pub fn recommend_action(delta: i32, is_completed: bool, capture_ratio: f64) -> &'static str {
    if is_completed {
        return if capture_ratio < 100.0 {
            "Collect pending payments for the completed stage"
        } else {
            "Stage closed - no action needed"
        };
    }
    match delta {
        0 if capture_ratio < 50.0 => "Invoice current stage work - capture is below 50%",
        0 => "Track current stage progress and close out billing",
        1 => "Line up workers and materials for the next stage",
        2 => "Plan resources for the upcoming stage",
        d if d > 2 => "Keep on the long-range plan",
        _ if capture_ratio == 0.0 => "Verify past stage - no revenue recorded",
        _ => "Close out the past stage and mark it completed",
    }
}

/// One stage of a project with its priority annotations
#[derive(Debug, Clone)]
pub struct StagePriority {
    /// The project's stage row
    pub project_stage: project_stage::Model,
    /// The construction stage
    pub stage: construction_stage::Model,
    /// Priority score in `[0, 100]`
    pub priority_score: f64,
    /// Captured share of the stage estimate, in percent
    pub capture_ratio: f64,
    /// Estimate not yet captured
    pub remaining_value: f64,
    /// Urgency band
    pub urgency: StageUrgency,
    /// Recommended next step
    pub action: &'static str,
    /// Position relative to the current stage
    pub position: StagePosition,
}

/// Every stage of a project, in construction order, annotated with its
/// priority score, urgency band, position and recommended action.
pub async fn get_project_stages_with_priority(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    project_id: i64,
) -> Result<Vec<StagePriority>> {
    let project = get_project(db, project_id).await?;
    let current_sequence = catalog.require_stage(project.current_stage_id)?.sequence_order;
    let rows = get_project_stages(db, catalog, project.id).await?;

    let mut stages = Vec::with_capacity(rows.len());
    for row in rows {
        let stage = catalog.require_stage(row.stage_id)?.clone();
        let delta = stage.sequence_order - current_sequence;
        let priority_score = stage_priority_score(&row, delta);
        let capture_ratio = stage_capture_ratio(&row);
        stages.push(StagePriority {
            remaining_value: stage_remaining_value(&row),
            urgency: StageUrgency::classify(&row, priority_score),
            action: recommend_action(delta, row.is_completed, capture_ratio),
            position: StagePosition::classify(delta, row.is_completed),
            priority_score,
            capture_ratio,
            stage,
            project_stage: row,
        });
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::activity::get_project_timeline;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn row(estimated: f64, captured: f64, margin: f64, completed: bool) -> project_stage::Model {
        project_stage::Model {
            id: 1,
            project_id: 1,
            stage_id: 1,
            estimated_stage_value: estimated,
            captured_stage_revenue: captured,
            expected_margin_percentage: margin,
            is_completed: completed,
            completion_date: None,
        }
    }

    #[test]
    fn test_stage_allocation() {
        assert_eq!(stage_allocation(1_000_000.0, 3, 8), (375_000.0, 19.5));
        assert_eq!(stage_allocation(1_000_000.0, 5, 8), (625_000.0, 22.5));
        assert_eq!(stage_allocation(0.0, 5, 8), (0.0, 20.0));
        assert_eq!(stage_allocation(1_000.0, 5, 0), (0.0, 20.0));
        assert_eq!(stage_allocation(1_000.0, 10, 10).1, 30.0);
    }

    #[test]
    fn test_position_score_table() {
        assert_eq!(position_score(0, false), 100.0);
        assert_eq!(position_score(1, false), 85.0);
        assert_eq!(position_score(2, false), 70.0);
        assert_eq!(position_score(3, false), 50.0);
        assert_eq!(position_score(4, false), 50.0);
        assert_eq!(position_score(5, false), 25.0);
        assert_eq!(position_score(-1, false), 40.0);
        assert_eq!(position_score(-3, true), 10.0);
    }

    #[test]
    fn test_stage_priority_score_current_stage() {
        // 100*0.4 + 100*0.25 + (22.5/30*100)*0.2 + 100*0.15
        let score = stage_priority_score(&row(625_000.0, 0.0, 22.5, false), 0);
        assert_eq!(score, 95.0);
    }

    #[test]
    fn test_stage_priority_score_completed_stage() {
        // 10*0.4 + 0 + (19.5/30*100)*0.2 + (100-100)*0.5*0.15
        let score = stage_priority_score(&row(50_000.0, 50_000.0, 19.5, true), -2);
        assert_eq!(score, 17.0);
    }

    #[test]
    fn test_stage_priority_score_stays_in_range() {
        let over_captured = stage_priority_score(&row(10_000.0, 40_000.0, 0.0, false), 6);
        assert!(over_captured >= 0.0);
        let maxed = stage_priority_score(&row(10_000_000.0, 0.0, 90.0, false), 0);
        assert_eq!(maxed, 100.0);
    }

    #[test]
    fn test_stage_capture_ratio_zero_estimate() {
        assert_eq!(stage_capture_ratio(&row(0.0, 500.0, 20.0, false)), 0.0);
        assert_eq!(stage_capture_ratio(&row(200.0, 50.0, 20.0, false)), 25.0);
    }

    #[test]
    fn test_urgency_and_position_labels() {
        let open = row(1000.0, 0.0, 20.0, false);
        assert_eq!(StageUrgency::classify(&open, 80.0), StageUrgency::Critical);
        assert_eq!(StageUrgency::classify(&open, 79.99), StageUrgency::High);
        assert_eq!(StageUrgency::classify(&open, 40.0), StageUrgency::Medium);
        assert_eq!(StageUrgency::classify(&open, 12.0), StageUrgency::Low);
        let unpaid = row(1000.0, 200.0, 20.0, true);
        assert_eq!(StageUrgency::classify(&unpaid, 90.0), StageUrgency::FollowUp);
        let paid = row(1000.0, 1000.0, 20.0, true);
        assert_eq!(StageUrgency::classify(&paid, 5.0).label(), "Completed");

        assert_eq!(StagePosition::classify(0, false).label(), "Current");
        assert_eq!(StagePosition::classify(2, false).label(), "Next+1");
        assert_eq!(StagePosition::classify(7, false).label(), "Future");
        assert_eq!(StagePosition::classify(-1, false).label(), "Past (Incomplete)");
        assert_eq!(StagePosition::classify(-1, true).label(), "Completed");
    }

    #[test]
    fn test_recommend_action() {
        assert!(recommend_action(0, false, 10.0).starts_with("Invoice"));
        assert!(recommend_action(-1, false, 0.0).starts_with("Verify"));
        assert!(recommend_action(-1, true, 40.0).starts_with("Collect"));
        assert_eq!(
            recommend_action(-1, true, 100.0),
            "Stage closed - no action needed"
        );
    }

    #[tokio::test]
    async fn test_create_project_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let catalog = ReferenceCatalog::default();

        let mut input = sample_new_project(1, 1, 1000.0);
        input.pincode = "12".to_string();
        let result = create_project(&db, &catalog, input).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation {
                field: "pincode",
                ..
            }
        ));

        let input = sample_new_project(1, 1, -5.0);
        let result = create_project(&db, &catalog, input).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let input = sample_new_project(1, 1, 1000.0);
        let result = create_project(&db, &catalog, input).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_project_two_stage_split() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;

        assert_eq!(project.project_code, format!("PRJ-{:05}", project.id));
        let by_code = get_project_by_code(&db, &project.project_code).await?;
        assert_eq!(by_code.map(|p| p.id), Some(project.id));
        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].estimated_stage_value, 375_000.0);
        assert_eq!(rows[0].expected_margin_percentage, 19.5);
        assert_eq!(rows[1].estimated_stage_value, 625_000.0);
        assert_eq!(rows[1].expected_margin_percentage, 22.5);
        assert!(rows.iter().all(|r| r.captured_stage_revenue == 0.0));

        let timeline = get_project_timeline(&db, project.id, 5).await?;
        assert_eq!(timeline[0].activity_type, "CREATED");
        Ok(())
    }

    #[tokio::test]
    async fn test_stage_shares_sum_to_estimate() -> Result<()> {
        let (db, catalog) = setup_with_catalog().await?;
        let total = 1_234_567.89;
        let project = create_test_project(&db, &catalog, total).await?;

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert_eq!(rows.len(), 15);
        let sum: f64 = rows.iter().map(|r| r.estimated_stage_value).sum();
        assert!((sum - total).abs() <= rows.len() as f64 * 0.01);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_value_project_gets_default_margin() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 0.0).await?;

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert!(rows.iter().all(|r| r.estimated_stage_value == 0.0));
        assert!(rows.iter().all(|r| r.expected_margin_percentage == 20.0));
        assert!(!recalculate_project_stage_estimates(&db, &catalog, project.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_recalculate_preserves_manual_edits() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;
        let rows = get_project_stages(&db, &catalog, project.id).await?;

        // First row: zeroed out entirely. Second row: manual value, zero margin.
        let mut first: project_stage::ActiveModel = rows[0].clone().into();
        first.estimated_stage_value = Set(0.0);
        first.expected_margin_percentage = Set(0.0);
        first.update(&db).await?;
        let mut second: project_stage::ActiveModel = rows[1].clone().into();
        second.estimated_stage_value = Set(700_000.0);
        second.expected_margin_percentage = Set(0.0);
        second.update(&db).await?;

        assert!(recalculate_project_stage_estimates(&db, &catalog, project.id).await?);

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert_eq!(rows[0].estimated_stage_value, 375_000.0);
        assert_eq!(rows[0].expected_margin_percentage, 19.5);
        assert_eq!(rows[1].estimated_stage_value, 700_000.0);
        assert_eq!(rows[1].expected_margin_percentage, 22.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_past_stages_completed_is_idempotent() -> Result<()> {
        let (db, catalog) = setup_with_catalog().await?;
        let slab = catalog.stage_by_code("SLAB_GF").unwrap();
        assert_eq!(slab.sequence_order, 5);
        let project =
            create_project(&db, &catalog, sample_new_project(slab.id, new_lead(&catalog), 900_000.0))
                .await?;

        assert_eq!(mark_past_stages_completed(&db, &catalog, project.id).await?, 4);
        assert_eq!(mark_past_stages_completed(&db, &catalog, project.id).await?, 0);

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        for row in &rows {
            let sequence = catalog.stage(row.stage_id).unwrap().sequence_order;
            if sequence < 5 {
                assert!(row.is_completed);
                assert_eq!(row.completion_date, Some(today()));
            } else {
                assert!(!row.is_completed);
                assert_eq!(row.completion_date, None);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_update_current_stage_closes_past_stages() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;
        let stage_b = catalog.stage_by_code("STAGE_B").unwrap();

        let moved =
            update_current_stage(&db, &catalog, project.id, stage_b.id, Some("slab poured"))
                .await?;
        assert_eq!(moved.current_stage_id, stage_b.id);

        let rows = get_project_stages(&db, &catalog, project.id).await?;
        assert!(rows[0].is_completed);
        assert!(!rows[1].is_completed);

        let timeline = get_project_timeline(&db, project.id, 1).await?;
        assert_eq!(timeline[0].activity_type, "STAGE_CHANGE");
        assert_eq!(timeline[0].old_value.as_deref(), Some("Stage A"));
        assert!(timeline[0].description.contains("slab poured"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_lead_status_logs_win() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000.0).await?;
        let won = catalog.lead_status_by_code("WON").unwrap();

        let updated = update_lead_status(&db, &catalog, project.id, won.id, None).await?;
        assert_eq!(updated.lead_status_id, won.id);

        let timeline = get_project_timeline(&db, project.id, 1).await?;
        assert_eq!(timeline[0].activity_type, "PROJECT_WON");

        let missing = update_lead_status(&db, &catalog, project.id, 9_999, None).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_predict_remaining_stages() -> Result<()> {
        let (db, catalog) = setup_with_catalog().await?;
        let roof = catalog.stage_by_code("ROOF").unwrap();
        let project =
            create_project(&db, &catalog, sample_new_project(roof.id, new_lead(&catalog), 1.0))
                .await?;

        let remaining = predict_remaining_stages(&catalog, &project)?;
        assert_eq!(remaining.len(), 8);
        assert_eq!(remaining[0].code, "PLASTER");
        Ok(())
    }

    #[tokio::test]
    async fn test_stages_with_priority_in_sequence_order() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;

        let stages = get_project_stages_with_priority(&db, &catalog, project.id).await?;
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage.code, "STAGE_A");
        assert_eq!(stages[0].position, StagePosition::Current);
        assert_eq!(stages[1].position, StagePosition::Next);
        // A: 100*0.4 + 100*0.25 + 65*0.2 + 100*0.15
        assert_eq!(stages[0].priority_score, 93.0);
        assert_eq!(stages[0].urgency, StageUrgency::Critical);
        assert_eq!(stages[0].remaining_value, 375_000.0);

        let score =
            calculate_stage_priority_score(&db, &catalog, &project, stages[1].stage.id).await?;
        assert_eq!(score, stages[1].priority_score);
        Ok(())
    }

    #[tokio::test]
    async fn test_priority_score_without_stage_row() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 1_000_000.0).await?;

        let score = calculate_stage_priority_score(&db, &catalog, &project, 9_999).await?;
        assert_eq!(score, 0.0);
        Ok(())
    }
}
