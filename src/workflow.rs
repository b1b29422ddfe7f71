//! Task & milestone engine.
//!
//! Lifecycle of a treatment task (creation, assignment, completion,
//! cancellation), its append-only note/image log, and the per-patient
//! milestone pipeline. Every operation authorizes against the record's
//! derived office before touching it; the office itself always comes
//! from the parent patient, never from the caller.

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::authorize;
use crate::db::repository::{
    self, get_milestone, get_task, insert_milestone, insert_task, insert_task_note,
    list_milestones_for_patient, list_task_notes,
};
use crate::directory::{resolve_office_for_patient, visible_staff};
use crate::error::WorkflowError;
use crate::models::enums::{MilestoneStatus, TaskStatus};
use crate::models::{AuthenticatedUser, Milestone, NewTask, Task, TaskNote, MAX_NOTE_IMAGES};

// ─── Tasks ────────────────────────────────────────────────────────────────────

/// Create a task on a patient. Title and assignee are required; the
/// assignee must be on the roster visible to `user`, which also pins
/// legacy free-text names to real staff. The task lands in the patient's
/// office whatever office the caller works from — creation is only
/// allowed when that office is visible to them.
pub fn create_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    new_task: NewTask,
) -> Result<Task, WorkflowError> {
    if new_task.title.trim().is_empty() {
        return Err(WorkflowError::validation("title", "must not be empty"));
    }
    if new_task.assignee.trim().is_empty() {
        return Err(WorkflowError::validation("assignee", "must not be empty"));
    }

    let office_id = resolve_office_for_patient(conn, &new_task.patient_id)?;
    let decision = authorize(user, office_id, "task.create");
    if !decision.allowed {
        return Err(WorkflowError::AccessDenied);
    }

    let roster = visible_staff(conn, user)?;
    if !roster
        .iter()
        .any(|s| s.display_name == new_task.assignee.trim())
    {
        return Err(WorkflowError::validation(
            "assignee",
            "not on the staff roster for this office",
        ));
    }

    let task = Task {
        id: Uuid::new_v4(),
        patient_id: new_task.patient_id,
        office_id: Some(office_id),
        title: new_task.title.trim().to_string(),
        description: new_task.description,
        assignee: new_task.assignee.trim().to_string(),
        priority: new_task.priority,
        due_date: new_task.due_date,
        status: TaskStatus::Open,
        completed_by: None,
        completed_at: None,
        created_by: user.display_name.clone(),
        created_at: Utc::now(),
    };
    insert_task(conn, &task)?;
    tracing::debug!(task = %task.id, patient = %task.patient_id, "task created");
    Ok(task)
}

/// Reassign a task. Tasks are cooperatively managed: any staff member
/// with visibility into the task's office may take this, not just the
/// current assignee.
pub fn reassign_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
    new_assignee: &str,
) -> Result<Task, WorkflowError> {
    if new_assignee.trim().is_empty() {
        return Err(WorkflowError::validation("assignee", "must not be empty"));
    }
    let task = authorized_task(conn, user, task_id, "task.reassign")?;

    let roster = visible_staff(conn, user)?;
    if !roster.iter().any(|s| s.display_name == new_assignee.trim()) {
        return Err(WorkflowError::validation(
            "assignee",
            "not on the staff roster for this office",
        ));
    }

    let updated = repository::update_task_assignee(conn, &task.id, new_assignee.trim())?;
    if updated == 0 {
        return Err(WorkflowError::validation(
            "status",
            "only an open task can be reassigned",
        ));
    }
    // Guarded update applied; re-read for the caller.
    require_task(conn, &task.id)
}

/// Complete a task. Actor and timestamp are recorded atomically with the
/// status flip — there is no way to close a task anonymously.
pub fn complete_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
) -> Result<Task, WorkflowError> {
    let task = authorized_task(conn, user, task_id, "task.complete")?;
    let updated = repository::complete_task(conn, &task.id, &user.display_name, Utc::now())?;
    if updated == 0 {
        return Err(WorkflowError::validation(
            "status",
            "only an open task can be completed",
        ));
    }
    require_task(conn, &task.id)
}

/// Cancel a task. A status flip, never a deletion — the row and its
/// notes stay for audit history.
pub fn cancel_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
) -> Result<Task, WorkflowError> {
    let task = authorized_task(conn, user, task_id, "task.cancel")?;
    let updated = repository::cancel_task(conn, &task.id)?;
    if updated == 0 {
        return Err(WorkflowError::validation(
            "status",
            "only an open task can be cancelled",
        ));
    }
    require_task(conn, &task.id)
}

// ─── Task notes ───────────────────────────────────────────────────────────────

/// Append a note to a task: text, up to five already-uploaded image
/// references, or both. One atomic insert — a partial note is never
/// visible. Notes cannot be edited or deleted.
pub fn add_note(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
    content: Option<&str>,
    image_refs: &[String],
) -> Result<TaskNote, WorkflowError> {
    let content = content.map(str::trim).filter(|c| !c.is_empty());
    if content.is_none() && image_refs.is_empty() {
        return Err(WorkflowError::validation(
            "content",
            "a note needs text or at least one image",
        ));
    }
    if image_refs.len() > MAX_NOTE_IMAGES {
        return Err(WorkflowError::validation(
            "image_refs",
            "a note carries at most 5 images",
        ));
    }

    let task = authorized_task(conn, user, task_id, "note.add")?;

    let id = Uuid::new_v4();
    let created_at = Utc::now();
    let seq = insert_task_note(
        conn,
        &id,
        &task.id,
        content,
        image_refs,
        &user.display_name,
        &created_at,
    )?;
    Ok(TaskNote {
        seq,
        id,
        task_id: task.id,
        office_id: task.office_id,
        content: content.map(String::from),
        image_refs: image_refs.to_vec(),
        created_by: user.display_name.clone(),
        created_at,
    })
}

/// Notes for a task in creation order.
pub fn list_notes(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
) -> Result<Vec<TaskNote>, WorkflowError> {
    let task = visible_task(conn, user, task_id)?;
    Ok(list_task_notes(conn, &task.id)?)
}

// ─── Milestones ───────────────────────────────────────────────────────────────

/// Add a milestone to a patient's pipeline. Always created `pending`,
/// even with an assignee attached — work starts only on an explicit
/// start.
pub fn create_milestone(
    conn: &Connection,
    user: &AuthenticatedUser,
    patient_id: &Uuid,
    name: &str,
    assignee: Option<&str>,
) -> Result<Milestone, WorkflowError> {
    if name.trim().is_empty() {
        return Err(WorkflowError::validation("name", "must not be empty"));
    }
    let office_id = resolve_office_for_patient(conn, patient_id)?;
    if !authorize(user, office_id, "milestone.create").allowed {
        return Err(WorkflowError::AccessDenied);
    }

    let milestone = Milestone {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        task_id: None,
        office_id: Some(office_id),
        name: name.trim().to_string(),
        status: MilestoneStatus::Pending,
        assignee: assignee.map(|a| a.trim().to_string()),
        due_date: None,
        completed_by: None,
        completed_at: None,
        created_at: Utc::now(),
    };
    insert_milestone(conn, &milestone)?;
    Ok(milestone)
}

/// pending → in_progress.
pub fn start_milestone(
    conn: &Connection,
    user: &AuthenticatedUser,
    milestone_id: &Uuid,
    assignee: Option<&str>,
) -> Result<Milestone, WorkflowError> {
    let milestone = authorized_milestone(conn, user, milestone_id, "milestone.start")?;
    let updated = repository::start_milestone(conn, &milestone.id, assignee)?;
    if updated == 0 {
        return Err(WorkflowError::validation(
            "status",
            "only a pending milestone can be started",
        ));
    }
    require_milestone(conn, &milestone.id)
}

/// in_progress → completed, recording who and when in the same
/// statement. `completed` is terminal: nothing moves a milestone out of
/// it, and a repeat of the step is a new milestone.
pub fn complete_milestone(
    conn: &Connection,
    user: &AuthenticatedUser,
    milestone_id: &Uuid,
) -> Result<Milestone, WorkflowError> {
    let milestone = authorized_milestone(conn, user, milestone_id, "milestone.complete")?;
    let updated =
        repository::complete_milestone(conn, &milestone.id, &user.display_name, Utc::now())?;
    if updated == 0 {
        let reason = match milestone.status {
            MilestoneStatus::Completed => "milestone is already completed",
            _ => "only an in-progress milestone can be completed",
        };
        return Err(WorkflowError::validation("status", reason));
    }
    require_milestone(conn, &milestone.id)
}

/// A patient's milestone history, oldest first.
pub fn patient_milestones(
    conn: &Connection,
    user: &AuthenticatedUser,
    patient_id: &Uuid,
) -> Result<Vec<Milestone>, WorkflowError> {
    let office_id = resolve_office_for_patient(conn, patient_id)?;
    if !authorize(user, office_id, "milestone.list").allowed {
        // Cross-tenant reads look like absence, never like denial.
        return Err(WorkflowError::not_found("patient", patient_id));
    }
    Ok(list_milestones_for_patient(conn, patient_id)?)
}

// ─── Authorization plumbing ───────────────────────────────────────────────────

/// Load a task and authorize a mutation against its derived office.
fn authorized_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
    operation: &str,
) -> Result<Task, WorkflowError> {
    let task = require_task(conn, task_id)?;
    let office_id = task.office_id.ok_or_else(|| {
        WorkflowError::InvariantViolation(format!("task {task_id} has no office assignment"))
    })?;
    if !authorize(user, office_id, operation).allowed {
        return Err(WorkflowError::AccessDenied);
    }
    Ok(task)
}

/// Like [`authorized_task`] but for read paths, where a cross-tenant id
/// must be indistinguishable from a nonexistent one.
fn visible_task(
    conn: &Connection,
    user: &AuthenticatedUser,
    task_id: &Uuid,
) -> Result<Task, WorkflowError> {
    match authorized_task(conn, user, task_id, "task.read") {
        Err(WorkflowError::AccessDenied) => Err(WorkflowError::not_found("task", task_id)),
        other => other,
    }
}

fn authorized_milestone(
    conn: &Connection,
    user: &AuthenticatedUser,
    milestone_id: &Uuid,
    operation: &str,
) -> Result<Milestone, WorkflowError> {
    let milestone = require_milestone(conn, milestone_id)?;
    let office_id = milestone.office_id.ok_or_else(|| {
        WorkflowError::InvariantViolation(format!(
            "milestone {milestone_id} has no office assignment"
        ))
    })?;
    if !authorize(user, office_id, operation).allowed {
        return Err(WorkflowError::AccessDenied);
    }
    Ok(milestone)
}

fn require_task(conn: &Connection, task_id: &Uuid) -> Result<Task, WorkflowError> {
    get_task(conn, task_id)?.ok_or_else(|| WorkflowError::not_found("task", task_id))
}

fn require_milestone(conn: &Connection, milestone_id: &Uuid) -> Result<Milestone, WorkflowError> {
    get_milestone(conn, milestone_id)?
        .ok_or_else(|| WorkflowError::not_found("milestone", milestone_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedConfig;
    use crate::db::repository::{insert_patient, list_tasks};
    use crate::db::sqlite::open_memory_database;
    use crate::directory::seed_directories;
    use crate::models::enums::TaskPriority;
    use crate::models::filters::TaskFilter;
    use crate::models::Patient;

    struct Fixture {
        conn: Connection,
        user: AuthenticatedUser,
        patient: Patient,
    }

    fn fixture() -> Fixture {
        let conn = open_memory_database().unwrap();
        seed_directories(&conn, &SeedConfig::default()).unwrap();
        let office = crate::db::repository::find_office_by_name(&conn, "Dentures Direct")
            .unwrap()
            .unwrap();
        let patient = Patient::new("June", "Abara", office.id);
        insert_patient(&conn, &patient).unwrap();
        let user = AuthenticatedUser::scoped("sandra@denturesdirect.example", "Sandra", office.id);
        Fixture {
            conn,
            user,
            patient,
        }
    }

    fn new_task(patient_id: Uuid, title: &str, assignee: &str) -> NewTask {
        NewTask {
            patient_id,
            title: title.into(),
            description: None,
            assignee: assignee.into(),
            priority: TaskPriority::Normal,
            due_date: None,
        }
    }

    #[test]
    fn empty_assignee_fails_validation() {
        let f = fixture();
        let err = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "")).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation { .. }));
    }

    #[test]
    fn created_task_inherits_patient_office() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();
        assert_eq!(task.office_id, f.patient.office_id);

        // And so does the persisted row.
        let loaded = get_task(&f.conn, &task.id).unwrap().unwrap();
        assert_eq!(loaded.office_id, f.patient.office_id);
    }

    #[test]
    fn assignee_outside_visible_roster_rejected() {
        let f = fixture();
        // Priya works at Westside; Sandra's roster view is Dentures Direct only.
        let err = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Priya"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation { .. }));

        // Head office sees the union and may assign her.
        let hq = AuthenticatedUser::head_office("michael@denturesdirect.example", "Michael");
        create_task(&f.conn, &hq, new_task(f.patient.id, "Reline", "Priya")).unwrap();
    }

    #[test]
    fn cross_office_user_cannot_touch_task() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();

        let westside = crate::db::repository::find_office_by_name(&f.conn, "Westside Denture Clinic")
            .unwrap()
            .unwrap();
        let outsider = AuthenticatedUser::scoped("p@westside.example", "Priya", westside.id);

        let reassign = reassign_task(&f.conn, &outsider, &task.id, "Priya");
        assert!(matches!(reassign, Err(WorkflowError::AccessDenied)));

        // Reads mask existence entirely.
        let notes = list_notes(&f.conn, &outsider, &task.id);
        assert!(matches!(notes, Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn note_requires_text_or_image_and_caps_images() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();

        let empty = add_note(&f.conn, &f.user, &task.id, Some("  "), &[]);
        assert!(matches!(empty, Err(WorkflowError::Validation { .. })));

        let too_many: Vec<String> = (0..6).map(|i| format!("img/{i}.jpg")).collect();
        let capped = add_note(&f.conn, &f.user, &task.id, None, &too_many);
        assert!(matches!(capped, Err(WorkflowError::Validation { .. })));

        let ok = add_note(&f.conn, &f.user, &task.id, None, &["img/0.jpg".into()]).unwrap();
        assert_eq!(ok.image_refs.len(), 1);
        assert_eq!(ok.office_id, f.patient.office_id);
    }

    #[test]
    fn notes_come_back_in_creation_order() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();
        for text in ["first", "second", "third"] {
            add_note(&f.conn, &f.user, &task.id, Some(text), &[]).unwrap();
        }

        let notes = list_notes(&f.conn, &f.user, &task.id).unwrap();
        let texts: Vec<_> = notes.iter().filter_map(|n| n.content.as_deref()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(notes.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn task_completion_records_actor_and_time_together() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();
        let done = complete_task(&f.conn, &f.user, &task.id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_by.as_deref(), Some("Sandra"));
        assert!(done.completed_at.is_some());

        // Terminal: a second completion fails.
        let again = complete_task(&f.conn, &f.user, &task.id);
        assert!(matches!(again, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn cancelled_task_row_survives() {
        let f = fixture();
        let task = create_task(&f.conn, &f.user, new_task(f.patient.id, "Reline", "Michael"))
            .unwrap();
        let cancelled = cancel_task(&f.conn, &f.user, &task.id).unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        let filter = TaskFilter {
            patient_id: Some(f.patient.id),
            ..TaskFilter::default()
        };
        let scope = crate::authorization::resolve_effective_office_filter(&f.user, None).unwrap();
        let all = list_tasks(&f.conn, &scope, &filter).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn milestone_lifecycle_is_monotonic() {
        let f = fixture();
        let milestone =
            create_milestone(&f.conn, &f.user, &f.patient.id, "Metal Design Out", None).unwrap();
        assert_eq!(milestone.status, MilestoneStatus::Pending);

        // pending cannot complete.
        let early = complete_milestone(&f.conn, &f.user, &milestone.id);
        assert!(matches!(early, Err(WorkflowError::Validation { .. })));

        let started = start_milestone(&f.conn, &f.user, &milestone.id, Some("Michael")).unwrap();
        assert_eq!(started.status, MilestoneStatus::InProgress);
        assert_eq!(started.assignee.as_deref(), Some("Michael"));

        let done = complete_milestone(&f.conn, &f.user, &milestone.id).unwrap();
        assert_eq!(done.status, MilestoneStatus::Completed);
        assert_eq!(done.completed_by.as_deref(), Some("Sandra"));
        let completed_at = done.completed_at.unwrap();

        // completed is terminal and keeps its original actor/timestamp.
        let restart = start_milestone(&f.conn, &f.user, &milestone.id, None);
        assert!(matches!(restart, Err(WorkflowError::Validation { .. })));
        let unchanged = get_milestone(&f.conn, &milestone.id).unwrap().unwrap();
        assert_eq!(unchanged.status, MilestoneStatus::Completed);
        assert_eq!(unchanged.completed_by.as_deref(), Some("Sandra"));
        assert_eq!(unchanged.completed_at, Some(completed_at));
    }

    #[test]
    fn milestone_created_with_assignee_still_starts_pending() {
        let f = fixture();
        let milestone =
            create_milestone(&f.conn, &f.user, &f.patient.id, "Setup Assigned", Some("Michael"))
                .unwrap();
        assert_eq!(milestone.status, MilestoneStatus::Pending);
        assert_eq!(milestone.assignee.as_deref(), Some("Michael"));
    }

    #[test]
    fn milestone_history_is_append_only_and_ordered() {
        let f = fixture();
        for name in ["Metal Design Out", "Setup Assigned", "Processing Complete"] {
            create_milestone(&f.conn, &f.user, &f.patient.id, name, None).unwrap();
        }
        let history = patient_milestones(&f.conn, &f.user, &f.patient.id).unwrap();
        let names: Vec<_> = history.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Metal Design Out", "Setup Assigned", "Processing Complete"]
        );
    }
}
