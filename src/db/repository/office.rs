use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::Office;

use super::{parse_datetime, parse_uuid};

pub fn insert_office(conn: &Connection, office: &Office) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO offices (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![
            office.id.to_string(),
            office.name,
            office.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Case-insensitive name lookup, matching the unique index on lower(name).
pub fn find_office_by_name(conn: &Connection, name: &str) -> Result<Option<Office>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, created_at FROM offices WHERE lower(name) = lower(?1)",
        params![name],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )
    .optional()?
    .map(office_from_row)
    .transpose()
}

pub fn list_offices(conn: &Connection) -> Result<Vec<Office>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM offices ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut offices = Vec::new();
    for row in rows {
        offices.push(office_from_row(row?)?);
    }
    Ok(offices)
}

fn office_from_row((id, name, created_at): (String, String, String)) -> Result<Office, DatabaseError> {
    Ok(Office {
        id: parse_uuid(&id)?,
        name,
        created_at: parse_datetime(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_find_by_name_any_case() {
        let conn = open_memory_database().unwrap();
        let office = Office::new("Dentures Direct");
        insert_office(&conn, &office).unwrap();

        let found = find_office_by_name(&conn, "DENTURES DIRECT").unwrap().unwrap();
        assert_eq!(found.id, office.id);
        assert_eq!(found.name, "Dentures Direct");
    }

    #[test]
    fn duplicate_name_rejected_by_index() {
        let conn = open_memory_database().unwrap();
        insert_office(&conn, &Office::new("Harbour Clinic")).unwrap();
        let dup = insert_office(&conn, &Office::new("harbour clinic"));
        assert!(dup.is_err());
    }

    #[test]
    fn list_is_name_ordered() {
        let conn = open_memory_database().unwrap();
        insert_office(&conn, &Office::new("Westside")).unwrap();
        insert_office(&conn, &Office::new("Airdrie")).unwrap();
        let names: Vec<String> = list_offices(&conn).unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Airdrie", "Westside"]);
    }
}
