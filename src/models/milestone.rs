use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MilestoneStatus;

/// One step of a patient's treatment pipeline ("Metal Design Out",
/// "Setup Assigned", ...). The per-patient milestone set is the
/// append-only history of the workflow: completed milestones are never
/// reopened, a repeat step is a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub task_id: Option<Uuid>,
    pub office_id: Option<Uuid>,
    pub name: String,
    pub status: MilestoneStatus,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
