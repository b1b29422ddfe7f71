use rusqlite::{params, Connection, OptionalExtension};

use crate::authorization::OfficeFilter;
use crate::db::DatabaseError;
use crate::models::Staff;

use super::{parse_datetime, parse_opt_uuid, parse_uuid};

/// Insert a roster entry, or update its email/office if the display name
/// is already present. Display names are the legacy join key for task
/// assignees, so the roster keeps them unique.
pub fn upsert_staff(conn: &Connection, staff: &Staff) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff (id, display_name, email, active, office_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(display_name) DO UPDATE SET
             email = COALESCE(excluded.email, staff.email),
             office_id = COALESCE(excluded.office_id, staff.office_id)",
        params![
            staff.id.to_string(),
            staff.display_name,
            staff.email,
            staff.active as i32,
            staff.office_id.map(|id| id.to_string()),
            staff.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_staff_by_name(conn: &Connection, display_name: &str) -> Result<Option<Staff>, DatabaseError> {
    conn.query_row(
        "SELECT id, display_name, email, active, office_id, created_at
         FROM staff WHERE display_name = ?1",
        params![display_name],
        map_staff_row,
    )
    .optional()?
    .map(staff_from_row)
    .transpose()
}

/// Active roster visible under the given office filter, name-ordered.
/// A single-office scope sees only that office's staff; the all-offices
/// scope sees the union across offices.
pub fn list_staff(conn: &Connection, scope: &OfficeFilter) -> Result<Vec<Staff>, DatabaseError> {
    let (sql, office): (&str, Option<String>) = match scope.office_id() {
        Some(id) => (
            "SELECT id, display_name, email, active, office_id, created_at
             FROM staff WHERE active = 1 AND office_id = ?1 ORDER BY display_name",
            Some(id.to_string()),
        ),
        None => (
            "SELECT id, display_name, email, active, office_id, created_at
             FROM staff WHERE active = 1 ORDER BY display_name",
            None,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let mut staff = Vec::new();
    match office {
        Some(office_id) => {
            let rows = stmt.query_map(params![office_id], map_staff_row)?;
            for row in rows {
                staff.push(staff_from_row(row?)?);
            }
        }
        None => {
            let rows = stmt.query_map([], map_staff_row)?;
            for row in rows {
                staff.push(staff_from_row(row?)?);
            }
        }
    }
    Ok(staff)
}

type StaffRow = (String, String, Option<String>, i32, Option<String>, String);

fn map_staff_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StaffRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn staff_from_row(row: StaffRow) -> Result<Staff, DatabaseError> {
    let (id, display_name, email, active, office_id, created_at) = row;
    Ok(Staff {
        id: parse_uuid(&id)?,
        display_name,
        email,
        active: active != 0,
        office_id: parse_opt_uuid(office_id)?,
        created_at: parse_datetime(&created_at)?,
    })
}
