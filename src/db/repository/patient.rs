use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::authorization::OfficeFilter;
use crate::db::DatabaseError;
use crate::models::enums::{DentureType, PaymentStatus, PredeterminationStatus};
use crate::models::filters::PatientFilter;
use crate::models::Patient;

use super::{parse_datetime, parse_opt_uuid, parse_uuid};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, office_id, payment_status,
     predetermination_status, upper_denture_type, lower_denture_type, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, office_id, payment_status,
         predetermination_status, upper_denture_type, lower_denture_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.office_id.map(|id| id.to_string()),
            patient.payment_status.as_str(),
            patient.predetermination_status.as_str(),
            patient.upper_denture_type.map(|d| d.as_str()),
            patient.lower_denture_type.map(|d| d.as_str()),
            patient.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id.to_string()],
        map_patient_row,
    )
    .optional()?
    .map(patient_from_row)
    .transpose()
}

/// List patients visible under the given office filter. The filter is the
/// only way to widen a query past a single office; there is no unscoped
/// variant of this function.
pub fn list_patients(
    conn: &Connection,
    scope: &OfficeFilter,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(office_id) = scope.office_id() {
        sql.push_str(" AND office_id = ?");
        args.push(Box::new(office_id.to_string()));
    }
    if let Some(last_name) = &filter.last_name {
        sql.push_str(" AND lower(last_name) = lower(?)");
        args.push(Box::new(last_name.clone()));
    }
    if let Some(payment) = filter.payment_status {
        sql.push_str(" AND payment_status = ?");
        args.push(Box::new(payment.as_str()));
    }
    sql.push_str(" ORDER BY last_name, first_name");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        map_patient_row,
    )?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// The patient's office assignment, straight from the authoritative row.
/// `Ok(None)` means the patient exists but has not been backfilled yet.
pub fn patient_office_id(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<Option<Uuid>>, DatabaseError> {
    let row: Option<Option<String>> = conn
        .query_row(
            "SELECT office_id FROM patients WHERE id = ?1",
            params![patient_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match row {
        None => Ok(None),
        Some(office) => Ok(Some(parse_opt_uuid(office)?)),
    }
}

type PatientRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn map_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
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
    ))
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, first_name, last_name, office_id, payment, predetermination, upper, lower, created_at) =
        row;
    Ok(Patient {
        id: parse_uuid(&id)?,
        first_name,
        last_name,
        office_id: parse_opt_uuid(office_id)?,
        payment_status: PaymentStatus::from_str(&payment)?,
        predetermination_status: PredeterminationStatus::from_str(&predetermination)?,
        upper_denture_type: upper.as_deref().map(DentureType::from_str).transpose()?,
        lower_denture_type: lower.as_deref().map(DentureType::from_str).transpose()?,
        created_at: parse_datetime(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::resolve_effective_office_filter;
    use crate::db::repository::insert_office;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{AuthenticatedUser, Office};

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let office = Office::new("Dentures Direct");
        insert_office(&conn, &office).unwrap();

        let patient = Patient::new("June", "Abara", office.id);
        insert_patient(&conn, &patient).unwrap();

        let loaded = get_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(loaded.office_id, Some(office.id));
        assert_eq!(loaded.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn scoped_list_excludes_other_offices() {
        let conn = open_memory_database().unwrap();
        let o1 = Office::new("Dentures Direct");
        let o2 = Office::new("Westside Denture Clinic");
        insert_office(&conn, &o1).unwrap();
        insert_office(&conn, &o2).unwrap();
        insert_patient(&conn, &Patient::new("A", "One", o1.id)).unwrap();
        insert_patient(&conn, &Patient::new("B", "Two", o2.id)).unwrap();

        let user = AuthenticatedUser::scoped("u@dd.example", "U", o1.id);
        let scope = resolve_effective_office_filter(&user, Some(o2.id)).unwrap();
        let patients = list_patients(&conn, &scope, &PatientFilter::default()).unwrap();
        assert_eq!(patients.len(), 1);
        assert!(patients.iter().all(|p| p.office_id == Some(o1.id)));
    }
}
