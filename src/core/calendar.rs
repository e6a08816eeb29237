//! Dated project events and deadline tracking.
//!
//! Activities, invoices, notes, project creation and expected completion
//! dates are folded into one feed of [`CalendarEvent`]s. Date bounds are
//! whole calendar days in UTC and both ends are inclusive.

use crate::{
    core::{catalog::ReferenceCatalog, today},
    entities::{
        Project, ProjectActivity, ProjectNote, ProjectRevenueTransaction, project,
        project_activity, project_note, project_revenue_transaction,
    },
    errors::Result,
};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use sea_orm::{Condition, PaginatorTrait, prelude::*};
use std::collections::HashMap;

/// How far ahead an expected completion date counts as upcoming.
pub const UPCOMING_DEADLINE_DAYS: u64 = 30;
/// How far back activities count as recent.
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Where an event comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CalendarEventKind {
    /// Project entered
    ProjectCreated,
    /// Timeline activity
    Activity,
    /// Invoice recorded
    Revenue,
    /// Note recorded
    Note,
    /// Expected completion date
    Deadline,
}

impl CalendarEventKind {
    /// Lower-case code, also the prefix of event ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectCreated => "project-created",
            Self::Activity => "activity",
            Self::Revenue => "revenue",
            Self::Note => "note",
            Self::Deadline => "deadline",
        }
    }
}

/// One dated event on a project
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Stable id, e.g. `"note-12"`
    pub id: String,
    /// Source of the event
    pub kind: CalendarEventKind,
    /// Day the event falls on
    pub date: NaiveDate,
    /// Project id
    pub project_id: i64,
    /// Project code
    pub project_code: String,
    /// Project name
    pub project_name: String,
    /// Short title
    pub title: String,
    /// Activity description, invoice number, note text, client or stage
    pub detail: String,
    /// Invoiced revenue, for revenue events
    pub amount: Option<f64>,
    /// Flagged notes
    pub is_important: bool,
    /// Deadlines already behind today
    pub is_overdue: bool,
}

/// Restricts [`get_calendar_events`]; an empty filter returns everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarFilter {
    /// First day included
    pub start: Option<NaiveDate>,
    /// Last day included
    pub end: Option<NaiveDate>,
    /// Single project
    pub project_id: Option<i64>,
}

impl CalendarFilter {
    fn date_range<C: ColumnTrait>(&self, column: C) -> Condition {
        let mut condition = Condition::all();
        if let Some(start) = self.start {
            condition = condition.add(column.gte(start));
        }
        if let Some(end) = self.end {
            condition = condition.add(column.lte(end));
        }
        condition
    }

    fn timestamp_range<C: ColumnTrait>(&self, column: C) -> Condition {
        let mut condition = Condition::all();
        if let Some(start) = self.start {
            condition = condition.add(column.gte(day_start(start)));
        }
        if let Some(next_day) = self.end.and_then(|end| end.checked_add_days(Days::new(1))) {
            condition = condition.add(column.lt(day_start(next_day)));
        }
        condition
    }

    fn project<C: ColumnTrait>(&self, column: C) -> Condition {
        let mut condition = Condition::all();
        if let Some(project_id) = self.project_id {
            condition = condition.add(column.eq(project_id));
        }
        condition
    }
}

fn day_start(date: NaiveDate) -> DateTimeUtc {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn event(
    kind: CalendarEventKind,
    source_id: i64,
    date: NaiveDate,
    project: &project::Model,
    title: String,
    detail: String,
) -> CalendarEvent {
    CalendarEvent {
        id: format!("{}-{source_id}", kind.as_str()),
        kind,
        date,
        project_id: project.id,
        project_code: project.project_code.clone(),
        project_name: project.name.clone(),
        title: format!("{}: {title}", project.project_code),
        detail,
        amount: None,
        is_important: false,
        is_overdue: false,
    }
}

/// Every dated event matching `filter`, by day and then by source.
pub async fn get_calendar_events(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
    filter: CalendarFilter,
) -> Result<Vec<CalendarEvent>> {
    let projects: HashMap<i64, project::Model> = Project::find()
        .filter(filter.project(project::Column::Id))
        .all(db)
        .await?
        .into_iter()
        .map(|project| (project.id, project))
        .collect();
    let now = today();
    let mut events = Vec::new();

    for project in projects.values() {
        let created = project.created_at.date_naive();
        if filter.start.is_none_or(|start| created >= start)
            && filter.end.is_none_or(|end| created <= end)
        {
            events.push(event(
                CalendarEventKind::ProjectCreated,
                project.id,
                created,
                project,
                "Project Created".to_string(),
                project.client_name.clone(),
            ));
        }

        let Some(deadline) = project.expected_completion_date else {
            continue;
        };
        if filter.start.is_none_or(|start| deadline >= start)
            && filter.end.is_none_or(|end| deadline <= end)
        {
            let stage = catalog
                .stage(project.current_stage_id)
                .map(|stage| stage.name.clone())
                .unwrap_or_default();
            events.push(CalendarEvent {
                is_overdue: deadline < now,
                ..event(
                    CalendarEventKind::Deadline,
                    project.id,
                    deadline,
                    project,
                    "Expected Completion".to_string(),
                    stage,
                )
            });
        }
    }

    let activities = ProjectActivity::find()
        .filter(filter.project(project_activity::Column::ProjectId))
        .filter(filter.timestamp_range(project_activity::Column::CreatedAt))
        .all(db)
        .await?;
    for activity in activities {
        if let Some(project) = projects.get(&activity.project_id) {
            events.push(event(
                CalendarEventKind::Activity,
                activity.id,
                activity.created_at.date_naive(),
                project,
                activity.activity_type.replace('_', " "),
                activity.description,
            ));
        }
    }

    let invoices = ProjectRevenueTransaction::find()
        .filter(filter.project(project_revenue_transaction::Column::ProjectId))
        .filter(filter.date_range(project_revenue_transaction::Column::TransactionDate))
        .all(db)
        .await?;
    for invoice in invoices {
        if let Some(project) = projects.get(&invoice.project_id) {
            let stage = catalog
                .stage(invoice.stage_id)
                .map_or("unknown stage", |stage| stage.name.as_str());
            events.push(CalendarEvent {
                amount: Some(invoice.revenue_amount),
                ..event(
                    CalendarEventKind::Revenue,
                    invoice.id,
                    invoice.transaction_date,
                    project,
                    format!("₹{:.2} ({stage})", invoice.revenue_amount),
                    invoice.invoice_number,
                )
            });
        }
    }

    let notes = ProjectNote::find()
        .filter(filter.project(project_note::Column::ProjectId))
        .filter(filter.timestamp_range(project_note::Column::CreatedAt))
        .all(db)
        .await?;
    for note in notes {
        if let Some(project) = projects.get(&note.project_id) {
            events.push(CalendarEvent {
                is_important: note.is_important,
                ..event(
                    CalendarEventKind::Note,
                    note.id,
                    note.created_at.date_naive(),
                    project,
                    "Note".to_string(),
                    note.note,
                )
            });
        }
    }

    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });
    Ok(events)
}

/// Deadline and activity counts across active projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarSummary {
    /// Active projects
    pub total_projects: u64,
    /// Active projects at a won lead status
    pub won_projects: u64,
    /// Active projects expected to finish within the next 30 days
    pub upcoming_deadlines: u64,
    /// Active projects past their expected completion and not at a final status
    pub overdue_projects: u64,
    /// Timeline activities in the last 7 days
    pub recent_activities: u64,
}

/// Deadline and activity counts for today.
pub async fn get_calendar_summary(
    db: &DatabaseConnection,
    catalog: &ReferenceCatalog,
) -> Result<CalendarSummary> {
    let now = today();
    let horizon = now
        .checked_add_days(Days::new(UPCOMING_DEADLINE_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let won_ids: Vec<i64> = catalog
        .lead_statuses()
        .iter()
        .filter(|status| status.is_won)
        .map(|status| status.id)
        .collect();
    let final_ids: Vec<i64> = catalog
        .lead_statuses()
        .iter()
        .filter(|status| status.is_final)
        .map(|status| status.id)
        .collect();
    let active = || Project::find().filter(project::Column::IsActive.eq(true));

    Ok(CalendarSummary {
        total_projects: active().count(db).await?,
        won_projects: active()
            .filter(project::Column::LeadStatusId.is_in(won_ids))
            .count(db)
            .await?,
        upcoming_deadlines: active()
            .filter(project::Column::ExpectedCompletionDate.gte(now))
            .filter(project::Column::ExpectedCompletionDate.lte(horizon))
            .count(db)
            .await?,
        overdue_projects: active()
            .filter(project::Column::ExpectedCompletionDate.lt(now))
            .filter(project::Column::LeadStatusId.is_not_in(final_ids))
            .count(db)
            .await?,
        recent_activities: ProjectActivity::find()
            .filter(
                project_activity::Column::CreatedAt
                    .gte(Utc::now() - chrono::Duration::days(RECENT_ACTIVITY_DAYS)),
            )
            .count(db)
            .await?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        activity::{NewProjectNote, add_project_note},
        project::{create_project, update_lead_status},
        revenue::{NewRevenueTransaction, record_transaction},
    };
    use crate::test_utils::*;

    fn days_from_today(days: i64) -> NaiveDate {
        today() + chrono::Duration::days(days)
    }

    async fn project_due(
        db: &DatabaseConnection,
        catalog: &ReferenceCatalog,
        expected: Option<NaiveDate>,
    ) -> Result<project::Model> {
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();
        let mut input = sample_new_project(stage_a.id, new_lead(catalog), 100_000.0);
        input.expected_completion_date = expected;
        create_project(db, catalog, input).await
    }

    #[tokio::test]
    async fn test_events_from_every_source() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = project_due(&db, &catalog, Some(days_from_today(-2))).await?;
        let stage_a = catalog.stage_by_code("STAGE_A").unwrap();
        record_transaction(
            &db,
            NewRevenueTransaction {
                project_id: project.id,
                stage_id: stage_a.id,
                worker_id: None,
                invoice_number: "INV-1".to_string(),
                revenue_amount: 12_500.0,
                cost_amount: 0.0,
                margin_amount: None,
                transaction_date: Some(days_from_today(-1)),
            },
        )
        .await?;
        add_project_note(
            &db,
            NewProjectNote {
                project_id: project.id,
                note: "Client wants a bigger balcony".to_string(),
                is_important: true,
                created_by: None,
            },
        )
        .await?;

        let events = get_calendar_events(&db, &catalog, CalendarFilter::default()).await?;
        let kinds: Vec<CalendarEventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CalendarEventKind::Deadline,
                CalendarEventKind::Revenue,
                CalendarEventKind::ProjectCreated,
                CalendarEventKind::Activity,
                CalendarEventKind::Activity,
                CalendarEventKind::Note,
            ]
        );

        let deadline = &events[0];
        assert!(deadline.is_overdue);
        assert_eq!(deadline.id, format!("deadline-{}", project.id));
        assert_eq!(deadline.detail, "Stage A");
        assert_eq!(
            deadline.title,
            format!("{}: Expected Completion", project.project_code)
        );

        let revenue = &events[1];
        assert_eq!(revenue.amount, Some(12_500.0));
        assert_eq!(revenue.detail, "INV-1");
        assert!(revenue.title.ends_with("₹12500.00 (Stage A)"));

        let note = events.last().unwrap();
        assert!(note.is_important);
        assert_eq!(note.detail, "Client wants a bigger balcony");
        assert!(events[3].title.ends_with("CREATED"));
        Ok(())
    }

    #[tokio::test]
    async fn test_events_filtered_by_range_and_project() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let near = project_due(&db, &catalog, Some(days_from_today(10))).await?;
        let far = project_due(&db, &catalog, Some(days_from_today(60))).await?;

        let future_only = CalendarFilter {
            start: Some(days_from_today(1)),
            end: Some(days_from_today(90)),
            project_id: None,
        };
        let events = get_calendar_events(&db, &catalog, future_only).await?;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == CalendarEventKind::Deadline));
        assert!(events.iter().all(|e| !e.is_overdue));
        assert_eq!(events[0].project_id, near.id);

        let one_project = CalendarFilter {
            project_id: Some(far.id),
            ..CalendarFilter::default()
        };
        let events = get_calendar_events(&db, &catalog, one_project).await?;
        assert!(events.iter().all(|e| e.project_id == far.id));
        assert_eq!(events.len(), 3);

        let today_only = CalendarFilter {
            start: Some(today()),
            end: Some(today()),
            project_id: Some(near.id),
        };
        let kinds: Vec<CalendarEventKind> = get_calendar_events(&db, &catalog, today_only)
            .await?
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![CalendarEventKind::ProjectCreated, CalendarEventKind::Activity]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_calendar_summary() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        project_due(&db, &catalog, Some(days_from_today(5))).await?;
        project_due(&db, &catalog, Some(days_from_today(45))).await?;
        project_due(&db, &catalog, Some(days_from_today(-3))).await?;
        let finished = project_due(&db, &catalog, Some(days_from_today(-8))).await?;
        project_due(&db, &catalog, None).await?;
        let won = catalog.lead_status_by_code("WON").unwrap();
        update_lead_status(&db, &catalog, finished.id, won.id, None).await?;

        let summary = get_calendar_summary(&db, &catalog).await?;
        assert_eq!(summary.total_projects, 5);
        assert_eq!(summary.won_projects, 1);
        assert_eq!(summary.upcoming_deadlines, 1);
        assert_eq!(summary.overdue_projects, 1);
        assert_eq!(summary.recent_activities, 6);
        Ok(())
    }
}
