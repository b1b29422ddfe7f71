use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{TaskPriority, TaskStatus};

/// A staff-assigned work item on a patient's treatment. Tasks are never
/// hard-deleted; cancellation is a status so the audit history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub office_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for task creation. The office is never part of
/// this: it is derived from the parent patient at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub patient_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
}
