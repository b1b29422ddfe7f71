use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::TaskNote;

use super::{parse_datetime, parse_opt_uuid, parse_uuid};

/// Append a note to a task in one atomic insert. Office derives from the
/// task's row; the store assigns the monotonic `seq` that fixes listing
/// order. Returns the assigned sequence number.
pub fn insert_task_note(
    conn: &Connection,
    id: &Uuid,
    task_id: &Uuid,
    content: Option<&str>,
    image_refs: &[String],
    created_by: &str,
    created_at: &chrono::DateTime<chrono::Utc>,
) -> Result<i64, DatabaseError> {
    let image_json = serde_json::to_string(image_refs)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    conn.execute(
        "INSERT INTO task_notes (id, task_id, office_id, content, image_refs, created_by, created_at)
         VALUES (?1, ?2,
                 (SELECT office_id FROM tasks WHERE tasks.id = ?2),
                 ?3, ?4, ?5, ?6)",
        params![
            id.to_string(),
            task_id.to_string(),
            content,
            image_json,
            created_by,
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Notes for a task in creation order. Insertion order is the only order.
pub fn list_task_notes(conn: &Connection, task_id: &Uuid) -> Result<Vec<TaskNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT seq, id, task_id, office_id, content, image_refs, created_by, created_at
         FROM task_notes WHERE task_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![task_id.to_string()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
        let (seq, id, task_id, office_id, content, image_refs, created_by, created_at) = row?;
        notes.push(TaskNote {
            seq,
            id: parse_uuid(&id)?,
            task_id: parse_uuid(&task_id)?,
            office_id: parse_opt_uuid(office_id)?,
            content,
            image_refs: serde_json::from_str(&image_refs)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            created_by,
            created_at: parse_datetime(&created_at)?,
        });
    }
    Ok(notes)
}
