use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Record an administrative event (office creation, backfill run, staff
/// promotion). Timestamps come from the store clock.
pub fn insert_audit_entry(
    conn: &Connection,
    actor: &str,
    action: &str,
    entity: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, actor, action, entity)
         VALUES (datetime('now'), ?1, ?2, ?3)",
        params![actor, action, entity],
    )?;
    Ok(())
}

/// Most recent audit entries as (timestamp, actor, action, entity).
pub fn recent_audit_entries(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<(String, String, String, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, actor, action, entity FROM audit_log
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn entries_come_back_newest_first() {
        let conn = open_memory_database().unwrap();
        insert_audit_entry(&conn, "admin", "office.create", "Dentures Direct").unwrap();
        insert_audit_entry(&conn, "admin", "backfill.run", "default=Dentures Direct").unwrap();

        let entries = recent_audit_entries(&conn, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].2, "backfill.run");
    }
}
