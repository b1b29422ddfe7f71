use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::MilestoneStatus;
use crate::models::Milestone;

use super::{parse_datetime, parse_opt_date, parse_opt_datetime, parse_opt_uuid, parse_uuid};

const MILESTONE_COLUMNS: &str = "id, patient_id, task_id, office_id, name, status, assignee,
     due_date, completed_by, completed_at, created_at";

/// Insert a milestone, always in `pending`. Office derives from the
/// parent patient like every other child record.
pub fn insert_milestone(conn: &Connection, milestone: &Milestone) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO milestones (id, patient_id, task_id, office_id, name, status, assignee,
         due_date, completed_by, completed_at, created_at)
         VALUES (?1, ?2, ?3,
                 (SELECT office_id FROM patients WHERE patients.id = ?2),
                 ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            milestone.id.to_string(),
            milestone.patient_id.to_string(),
            milestone.task_id.map(|id| id.to_string()),
            milestone.name,
            milestone.status.as_str(),
            milestone.assignee,
            milestone.due_date.map(|d| d.to_string()),
            milestone.completed_by,
            milestone.completed_at.map(|t| t.to_rfc3339()),
            milestone.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_milestone(conn: &Connection, id: &Uuid) -> Result<Option<Milestone>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?1"),
        params![id.to_string()],
        map_milestone_row,
    )
    .optional()?
    .map(milestone_from_row)
    .transpose()
}

/// pending → in_progress. Guarded on the current status; returns the
/// number of rows moved (0 when the milestone was not pending).
pub fn start_milestone(
    conn: &Connection,
    id: &Uuid,
    assignee: Option<&str>,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE milestones SET status = 'in_progress',
             assignee = COALESCE(?2, assignee)
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), assignee],
    )?;
    Ok(updated)
}

/// in_progress → completed. One statement sets status, actor, and
/// timestamp together; the guard plus the table CHECK make a completed
/// row without an actor unreachable.
pub fn complete_milestone(
    conn: &Connection,
    id: &Uuid,
    completed_by: &str,
    completed_at: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE milestones SET status = 'completed', completed_by = ?2, completed_at = ?3
         WHERE id = ?1 AND status = 'in_progress'",
        params![id.to_string(), completed_by, completed_at.to_rfc3339()],
    )?;
    Ok(updated)
}

/// The append-only milestone history for a patient, oldest first.
pub fn list_milestones_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Milestone>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE patient_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], map_milestone_row)?;

    let mut milestones = Vec::new();
    for row in rows {
        milestones.push(milestone_from_row(row?)?);
    }
    Ok(milestones)
}

type MilestoneRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn map_milestone_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MilestoneRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn milestone_from_row(row: MilestoneRow) -> Result<Milestone, DatabaseError> {
    let (
        id,
        patient_id,
        task_id,
        office_id,
        name,
        status,
        assignee,
        due_date,
        completed_by,
        completed_at,
        created_at,
    ) = row;
    Ok(Milestone {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        task_id: parse_opt_uuid(task_id)?,
        office_id: parse_opt_uuid(office_id)?,
        name,
        status: MilestoneStatus::from_str(&status)?,
        assignee,
        due_date: parse_opt_date(due_date),
        completed_by,
        completed_at: parse_opt_datetime(completed_at)?,
        created_at: parse_datetime(&created_at)?,
    })
}
