//! Tenant and staff directories.
//!
//! Authoritative registry of offices, the canonical patient → office
//! mapping, and the assignable-staff roster. Offices and roster entries
//! are seeded from configuration at startup, never from literals
//! scattered through call sites.

use rusqlite::Connection;
use uuid::Uuid;

use crate::authorization::resolve_effective_office_filter;
use crate::config::SeedConfig;
use crate::db::repository::{
    find_office_by_name, find_staff_by_name, insert_audit_entry, insert_office, list_staff,
    patient_office_id, upsert_staff,
};
use crate::error::WorkflowError;
use crate::models::{AuthenticatedUser, Office, Staff};

/// Create an office. Names collide case-insensitively; office creation
/// is audited. Offices are never deleted — removal would orphan every
/// record under them.
pub fn create_office(
    conn: &Connection,
    name: &str,
    actor: &str,
) -> Result<Office, WorkflowError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkflowError::validation("name", "must not be empty"));
    }
    if find_office_by_name(conn, name)?.is_some() {
        return Err(WorkflowError::DuplicateName(name.to_string()));
    }

    let office = Office::new(name);
    insert_office(conn, &office)?;
    insert_audit_entry(conn, actor, "office.create", &office.name)?;
    tracing::info!(office = %office.name, id = %office.id, "office created");
    Ok(office)
}

/// The office a patient belongs to. A patient without an office in
/// steady state is a tenancy invariant violation, not a lookup miss, and
/// is surfaced as such.
pub fn resolve_office_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Uuid, WorkflowError> {
    match patient_office_id(conn, patient_id)? {
        None => Err(WorkflowError::not_found("patient", patient_id)),
        Some(None) => Err(WorkflowError::InvariantViolation(format!(
            "patient {patient_id} has no office assignment"
        ))),
        Some(Some(office_id)) => Ok(office_id),
    }
}

/// The staff roster `user` may assign work to: a single-office user sees
/// their office's roster, a head-office user sees the union across all
/// offices. Pure function of the user's affiliation and the stored
/// roster — recomputed on every call, never cached.
pub fn visible_staff(
    conn: &Connection,
    user: &AuthenticatedUser,
) -> Result<Vec<Staff>, WorkflowError> {
    let scope = resolve_effective_office_filter(user, None)?;
    Ok(list_staff(conn, &scope)?)
}

/// Load the configured offices and roster into the directory,
/// create-if-absent. Safe to run at every startup.
pub fn seed_directories(conn: &Connection, config: &SeedConfig) -> Result<(), WorkflowError> {
    for name in &config.offices {
        if find_office_by_name(conn, name)?.is_none() {
            create_office(conn, name, "system.seed")?;
        }
    }
    for member in &config.staff {
        let office_id = match &member.office {
            Some(office_name) => find_office_by_name(conn, office_name)?.map(|o| o.id),
            None => None,
        };
        if find_staff_by_name(conn, &member.display_name)?.is_none() || office_id.is_some() {
            let mut staff = Staff::new(member.display_name.clone(), office_id);
            staff.email = member.email.clone();
            upsert_staff(conn, &staff)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_patient;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Patient;

    #[test]
    fn duplicate_office_name_rejected() {
        let conn = open_memory_database().unwrap();
        create_office(&conn, "Dentures Direct", "admin").unwrap();
        let err = create_office(&conn, "DENTURES DIRECT", "admin").unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateName(_)));
    }

    #[test]
    fn resolve_office_distinguishes_missing_from_unassigned() {
        let conn = open_memory_database().unwrap();
        let office = create_office(&conn, "Dentures Direct", "admin").unwrap();

        let assigned = Patient::new("June", "Abara", office.id);
        insert_patient(&conn, &assigned).unwrap();
        assert_eq!(
            resolve_office_for_patient(&conn, &assigned.id).unwrap(),
            office.id
        );

        let missing = resolve_office_for_patient(&conn, &Uuid::new_v4());
        assert!(matches!(missing, Err(WorkflowError::NotFound { .. })));

        let mut legacy = Patient::new("Old", "Row", office.id);
        legacy.office_id = None;
        insert_patient(&conn, &legacy).unwrap();
        let unassigned = resolve_office_for_patient(&conn, &legacy.id);
        assert!(matches!(
            unassigned,
            Err(WorkflowError::InvariantViolation(_))
        ));
    }

    #[test]
    fn seeding_twice_creates_nothing_new() {
        let conn = open_memory_database().unwrap();
        let config = SeedConfig::default();
        seed_directories(&conn, &config).unwrap();
        seed_directories(&conn, &config).unwrap();

        let offices = crate::db::repository::list_offices(&conn).unwrap();
        assert_eq!(offices.len(), config.offices.len());
    }
}
