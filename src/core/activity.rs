//! Project timeline entries.
//!
//! Lifecycle operations (creation, stage and status changes, worker moves,
//! notes) append an activity row inside their own database transaction, so
//! the timeline never records a change that was rolled back.

use crate::{
    core::{project::get_project, validation},
    entities::{ProjectActivity, ProjectNote, project_activity, project_note},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Characters of a note quoted in its timeline entry.
const NOTE_PREVIEW_CHARS: usize = 100;

/// Kinds of timeline event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// Project entered
    Created,
    /// Construction stage moved
    StageChange,
    /// Lead status moved to a non-terminal status
    StatusChange,
    /// Lead status moved to a won status
    ProjectWon,
    /// Lead status moved to a lost status
    ProjectLost,
    /// Worker linked or assigned to the project
    WorkerAssigned,
    /// Worker link removed
    WorkerRemoved,
    /// Assigned work finished
    AssignmentCompleted,
    /// Note recorded on the project
    NoteAdded,
}

impl ActivityKind {
    /// Code stored in `project_activities.activity_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::StageChange => "STAGE_CHANGE",
            Self::StatusChange => "STATUS_CHANGE",
            Self::ProjectWon => "PROJECT_WON",
            Self::ProjectLost => "PROJECT_LOST",
            Self::WorkerAssigned => "WORKER_ASSIGNED",
            Self::WorkerRemoved => "WORKER_REMOVED",
            Self::AssignmentCompleted => "ASSIGNMENT_COMPLETED",
            Self::NoteAdded => "NOTE_ADDED",
        }
    }
}

/// One event to append
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    /// Project the event happened on
    pub project_id: i64,
    /// Event kind
    pub kind: ActivityKind,
    /// Human-readable description
    pub description: String,
    /// Value before a change
    pub old_value: Option<String>,
    /// Value after a change
    pub new_value: Option<String>,
    /// Worker involved
    pub related_worker_id: Option<i64>,
}

impl ActivityRecord {
    /// Event with only a description.
    pub fn new(project_id: i64, kind: ActivityKind, description: impl Into<String>) -> Self {
        Self {
            project_id,
            kind,
            description: description.into(),
            old_value: None,
            new_value: None,
            related_worker_id: None,
        }
    }

    /// Adds the before/after values of a change.
    #[must_use]
    pub fn with_change(mut self, old_value: &str, new_value: &str) -> Self {
        self.old_value = Some(old_value.to_string());
        self.new_value = Some(new_value.to_string());
        self
    }

    /// Adds the worker involved.
    #[must_use]
    pub const fn with_worker(mut self, worker_id: i64) -> Self {
        self.related_worker_id = Some(worker_id);
        self
    }
}

/// Appends `record` to its project's timeline.
pub async fn log_activity<C>(db: &C, record: ActivityRecord) -> Result<project_activity::Model>
where
    C: ConnectionTrait,
{
    let model = project_activity::ActiveModel {
        project_id: Set(record.project_id),
        activity_type: Set(record.kind.as_str().to_string()),
        description: Set(record.description),
        old_value: Set(record.old_value),
        new_value: Set(record.new_value),
        related_worker_id: Set(record.related_worker_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Appends a free-text note to a stage or status change description.
pub(crate) fn with_notes(description: String, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{description}\nNotes: {notes}"),
        None => description,
    }
}

/// Most recent timeline entries for a project, newest first.
pub async fn get_project_timeline(
    db: &DatabaseConnection,
    project_id: i64,
    limit: u64,
) -> Result<Vec<project_activity::Model>> {
    ProjectActivity::find()
        .filter(project_activity::Column::ProjectId.eq(project_id))
        .order_by_desc(project_activity::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Input for [`add_project_note`]
#[derive(Debug, Clone)]
pub struct NewProjectNote {
    /// Project the note is about
    pub project_id: i64,
    /// Note text
    pub note: String,
    /// Flag for attention
    pub is_important: bool,
    /// Author
    pub created_by: Option<String>,
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Records a note on a project and quotes its start on the timeline.
#[instrument(skip(db, new_note), fields(project_id = new_note.project_id))]
pub async fn add_project_note(
    db: &DatabaseConnection,
    new_note: NewProjectNote,
) -> Result<project_note::Model> {
    validation::require_non_empty("note", &new_note.note)?;

    let txn = db.begin().await?;
    let project = get_project(&txn, new_note.project_id).await?;
    let note = project_note::ActiveModel {
        project_id: Set(project.id),
        note: Set(new_note.note.trim().to_string()),
        is_important: Set(new_note.is_important),
        created_by: Set(new_note.created_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    log_activity(
        &txn,
        ActivityRecord::new(
            project.id,
            ActivityKind::NoteAdded,
            format!("Note added: {}", preview(&note.note, NOTE_PREVIEW_CHARS)),
        ),
    )
    .await?;
    txn.commit().await?;

    info!("Note {} added to project {}", note.id, project.project_code);
    Ok(note)
}

/// A project's notes, newest first.
pub async fn get_project_notes(
    db: &DatabaseConnection,
    project_id: i64,
) -> Result<Vec<project_note::Model>> {
    ProjectNote::find()
        .filter(project_note::Column::ProjectId.eq(project_id))
        .order_by_desc(project_note::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[test]
    fn test_with_notes() {
        assert_eq!(with_notes("Moved".to_string(), None), "Moved");
        assert_eq!(with_notes("Moved".to_string(), Some("  ")), "Moved");
        assert_eq!(
            with_notes("Moved".to_string(), Some("rain delay")),
            "Moved\nNotes: rain delay"
        );
    }

    #[tokio::test]
    async fn test_timeline_newest_first() -> Result<()> {
        let (db, catalog) = setup_with_catalog().await?;
        let project = create_test_project(&db, &catalog, 500_000.0).await?;

        log_activity(
            &db,
            ActivityRecord::new(project.id, ActivityKind::StatusChange, "Quoted")
                .with_change("New Lead", "Quotation Sent"),
        )
        .await?;

        let timeline = get_project_timeline(&db, project.id, 10).await?;
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].activity_type, "STATUS_CHANGE");
        assert_eq!(timeline[0].new_value.as_deref(), Some("Quotation Sent"));
        assert_eq!(timeline[1].activity_type, "CREATED");

        let latest_only = get_project_timeline(&db, project.id, 1).await?;
        assert_eq!(latest_only.len(), 1);
        Ok(())
    }

    #[test]
    fn test_note_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("₹₹₹₹", 2), "₹₹...");
    }

    #[tokio::test]
    async fn test_add_note_logs_preview() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 500_000.0).await?;
        let text = "x".repeat(120);

        let note = add_project_note(
            &db,
            NewProjectNote {
                project_id: project.id,
                note: text.clone(),
                is_important: true,
                created_by: Some("site office".to_string()),
            },
        )
        .await?;
        assert_eq!(note.note, text);
        assert!(note.is_important);

        let timeline = get_project_timeline(&db, project.id, 1).await?;
        assert_eq!(timeline[0].activity_type, "NOTE_ADDED");
        assert_eq!(
            timeline[0].description,
            format!("Note added: {}...", "x".repeat(100))
        );
        assert_eq!(get_project_notes(&db, project.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_note_rejects_empty_text_and_unknown_project() -> Result<()> {
        let (db, catalog) = setup_with_two_stages().await?;
        let project = create_test_project(&db, &catalog, 500_000.0).await?;

        let blank = add_project_note(
            &db,
            NewProjectNote {
                project_id: project.id,
                note: "   ".to_string(),
                is_important: false,
                created_by: None,
            },
        )
        .await;
        assert!(matches!(blank.unwrap_err(), Error::Validation { field: "note", .. }));

        let orphan = add_project_note(
            &db,
            NewProjectNote {
                project_id: 9_999,
                note: "Slab poured".to_string(),
                is_important: false,
                created_by: None,
            },
        )
        .await;
        assert!(matches!(orphan.unwrap_err(), Error::NotFound { .. }));
        assert_eq!(ProjectNote::find().count(&db).await?, 0);
        Ok(())
    }
}
