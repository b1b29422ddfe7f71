use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::authorization::OfficeFilter;
use crate::db::DatabaseError;
use crate::models::enums::{TaskPriority, TaskStatus};
use crate::models::filters::TaskFilter;
use crate::models::Task;

use super::{parse_datetime, parse_opt_date, parse_opt_datetime, parse_opt_uuid, parse_uuid};

const TASK_COLUMNS: &str = "id, patient_id, office_id, title, description, assignee, priority,
     due_date, status, completed_by, completed_at, created_by, created_at";

/// Insert a task. The office is derived from the parent patient inside
/// the statement itself — callers never supply it, so a task can never be
/// created under a different tenant than its patient.
pub fn insert_task(conn: &Connection, task: &Task) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO tasks (id, patient_id, office_id, title, description, assignee, priority,
         due_date, status, completed_by, completed_at, created_by, created_at)
         VALUES (?1, ?2,
                 (SELECT office_id FROM patients WHERE patients.id = ?2),
                 ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            task.id.to_string(),
            task.patient_id.to_string(),
            task.title,
            task.description,
            task.assignee,
            task.priority.as_str(),
            task.due_date.map(|d| d.to_string()),
            task.status.as_str(),
            task.completed_by,
            task.completed_at.map(|t| t.to_rfc3339()),
            task.created_by,
            task.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_task(conn: &Connection, id: &Uuid) -> Result<Option<Task>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        params![id.to_string()],
        map_task_row,
    )
    .optional()?
    .map(task_from_row)
    .transpose()
}

pub fn update_task_assignee(
    conn: &Connection,
    id: &Uuid,
    assignee: &str,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE tasks SET assignee = ?2 WHERE id = ?1 AND status = 'open'",
        params![id.to_string(), assignee],
    )?;
    Ok(updated)
}

/// Close a task. Status, actor, and timestamp move together in one
/// statement, guarded so only an open task can complete; the CHECK
/// constraint on the table makes a half-written completion unreachable.
pub fn complete_task(
    conn: &Connection,
    id: &Uuid,
    completed_by: &str,
    completed_at: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE tasks SET status = 'completed', completed_by = ?2, completed_at = ?3
         WHERE id = ?1 AND status = 'open'",
        params![id.to_string(), completed_by, completed_at.to_rfc3339()],
    )?;
    Ok(updated)
}

/// Cancellation is a status flip, never a row removal.
pub fn cancel_task(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE tasks SET status = 'cancelled' WHERE id = ?1 AND status = 'open'",
        params![id.to_string()],
    )?;
    Ok(updated)
}

pub fn list_tasks(
    conn: &Connection,
    scope: &OfficeFilter,
    filter: &TaskFilter,
) -> Result<Vec<Task>, DatabaseError> {
    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(office_id) = scope.office_id() {
        sql.push_str(" AND office_id = ?");
        args.push(Box::new(office_id.to_string()));
    }
    if let Some(patient_id) = filter.patient_id {
        sql.push_str(" AND patient_id = ?");
        args.push(Box::new(patient_id.to_string()));
    }
    if let Some(assignee) = &filter.assignee {
        sql.push_str(" AND assignee = ?");
        args.push(Box::new(assignee.clone()));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        args.push(Box::new(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        sql.push_str(" AND priority = ?");
        args.push(Box::new(priority.as_str()));
    }
    sql.push_str(" ORDER BY created_at");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        map_task_row,
    )?;

    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(task_from_row(row?)?);
    }
    Ok(tasks)
}

type TaskRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
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
        row.get(11)?,
        row.get(12)?,
    ))
}

fn task_from_row(row: TaskRow) -> Result<Task, DatabaseError> {
    let (
        id,
        patient_id,
        office_id,
        title,
        description,
        assignee,
        priority,
        due_date,
        status,
        completed_by,
        completed_at,
        created_by,
        created_at,
    ) = row;
    Ok(Task {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        office_id: parse_opt_uuid(office_id)?,
        title,
        description,
        assignee,
        priority: TaskPriority::from_str(&priority)?,
        due_date: parse_opt_date(due_date),
        status: TaskStatus::from_str(&status)?,
        completed_by,
        completed_at: parse_opt_datetime(completed_at)?,
        created_by,
        created_at: parse_datetime(&created_at)?,
    })
}
