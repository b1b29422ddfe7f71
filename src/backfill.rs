//! Tenancy backfill.
//!
//! Retrofits office assignments onto a tenant-naive dataset. Five steps,
//! each idempotent and each in its own transaction, so the prescribed
//! recovery after any partial failure is simply to re-run the whole
//! procedure. A clean second run reports zero rows for every step.
//!
//! Step order is load-bearing: the NOT NULL tightening comes last so an
//! incomplete assignment fails the constraint step loudly instead of
//! silently leaving unassigned patients behind.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SeedConfig;
use crate::db::repository::{find_office_by_name, insert_audit_entry, insert_office};
use crate::error::WorkflowError;
use crate::models::Office;

/// Child tables that carry office_id derived through patient_id.
const CHILD_TABLES: &[&str] = &[
    "tasks",
    "milestones",
    "clinical_notes",
    "lab_prescriptions",
    "patient_files",
    "appointments",
];

#[derive(Debug, Clone, Serialize)]
pub struct BackfillStep {
    pub name: &'static str,
    pub rows_affected: usize,
}

/// Machine-readable run report. An operator compares `rows_affected`
/// against expectations before trusting a run — "children updated: 0"
/// on a database known to hold children signals a join-key problem, not
/// success.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    pub default_office: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<BackfillStep>,
}

impl BackfillReport {
    /// True when the run changed nothing — the signature of a re-run
    /// over an already-backfilled database.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|s| s.rows_affected == 0)
    }
}

/// Run the full backfill. Takes `&mut Connection` because each step owns
/// a transaction; the patient-assignment step takes the write lock
/// immediately so two concurrent runs serialize rather than racing to
/// assign different offices to the same patient.
pub fn run_backfill(
    conn: &mut Connection,
    config: &SeedConfig,
) -> Result<BackfillReport, WorkflowError> {
    let started_at = Utc::now();
    let mut steps = Vec::with_capacity(5);

    let created = seed_offices(conn, config)?;
    steps.push(BackfillStep {
        name: "offices_seeded",
        rows_affected: created,
    });

    let default_office = find_office_by_name(conn, &config.default_office)?.ok_or_else(|| {
        WorkflowError::InvariantViolation(format!(
            "default office '{}' missing after seed step",
            config.default_office
        ))
    })?;

    let assigned = assign_default_office(conn, &default_office.id)?;
    steps.push(BackfillStep {
        name: "patients_assigned",
        rows_affected: assigned,
    });

    let propagated = propagate_child_offices(conn)?;
    steps.push(BackfillStep {
        name: "children_updated",
        rows_affected: propagated,
    });

    let promoted = promote_staff_accounts(conn, &default_office.id, config)?;
    steps.push(BackfillStep {
        name: "staff_promoted",
        rows_affected: promoted,
    });

    let tightened = tighten_patient_office_constraint(conn)?;
    steps.push(BackfillStep {
        name: "constraint_tightened",
        rows_affected: tightened,
    });

    insert_audit_entry(
        conn,
        "system.backfill",
        "backfill.run",
        &format!("default={}", default_office.name),
    )?;

    let report = BackfillReport {
        default_office: default_office.name,
        started_at,
        finished_at: Utc::now(),
        steps,
    };
    tracing::info!(noop = report.is_noop(), "backfill complete");
    Ok(report)
}

/// Step 1 — create the configured offices if absent, matched by name.
fn seed_offices(conn: &mut Connection, config: &SeedConfig) -> Result<usize, WorkflowError> {
    let tx = conn.transaction()?;
    let mut created = 0;
    for name in &config.offices {
        if find_office_by_name(&tx, name)?.is_none() {
            insert_office(&tx, &Office::new(name.clone()))?;
            tracing::info!(office = %name, "seeded office");
            created += 1;
        }
    }
    tx.commit()?;
    Ok(created)
}

/// Step 2 — every patient without an office goes to the default office.
/// The only step that invents tenancy instead of deriving it: all data
/// predating multi-office operation belonged to the original office, and
/// which one that is arrives as configuration, not convention. Fills
/// NULLs only, so already-assigned patients are never touched.
fn assign_default_office(
    conn: &mut Connection,
    default_office: &Uuid,
) -> Result<usize, WorkflowError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let assigned = tx.execute(
        "UPDATE patients SET office_id = ?1 WHERE office_id IS NULL",
        params![default_office.to_string()],
    )?;
    tx.commit()?;
    if assigned > 0 {
        tracing::info!(assigned, "assigned patients to default office");
    }
    Ok(assigned)
}

/// Step 3 — propagate office_id to child records by joining through the
/// parent patient. Only NULLs are filled; an already-assigned child is
/// never overwritten, whatever it says.
fn propagate_child_offices(conn: &mut Connection) -> Result<usize, WorkflowError> {
    let tx = conn.transaction()?;
    let mut total = 0;
    for table in CHILD_TABLES {
        let updated = tx.execute(
            &format!(
                "UPDATE {table} SET office_id =
                     (SELECT office_id FROM patients WHERE patients.id = {table}.patient_id)
                 WHERE office_id IS NULL
                   AND patient_id IN (SELECT id FROM patients)"
            ),
            [],
        )?;
        tracing::info!(table, updated, "propagated office to children");
        total += updated;
    }
    // Notes hang off tasks, not patients, so they join one level deeper.
    let notes = tx.execute(
        "UPDATE task_notes SET office_id =
             (SELECT office_id FROM tasks WHERE tasks.id = task_notes.task_id)
         WHERE office_id IS NULL
           AND task_id IN (SELECT id FROM tasks)",
        [],
    )?;
    tracing::info!(table = "task_notes", updated = notes, "propagated office to children");
    total += notes;
    tx.commit()?;
    Ok(total)
}

/// Step 4 — put officeless staff and user accounts under the default
/// office, and grant cross-office visibility to the configured
/// head-office accounts.
fn promote_staff_accounts(
    conn: &mut Connection,
    default_office: &Uuid,
    config: &SeedConfig,
) -> Result<usize, WorkflowError> {
    let tx = conn.transaction()?;
    let mut total = tx.execute(
        "UPDATE staff SET office_id = ?1 WHERE office_id IS NULL",
        params![default_office.to_string()],
    )?;
    total += tx.execute(
        "UPDATE users SET office_id = ?1 WHERE office_id IS NULL",
        params![default_office.to_string()],
    )?;
    for email in &config.head_office_emails {
        total += tx.execute(
            "UPDATE users SET can_view_all_offices = 1
             WHERE lower(email) = lower(?1) AND can_view_all_offices = 0",
            params![email],
        )?;
    }
    tx.commit()?;
    Ok(total)
}

/// Step 5 — tighten patients.office_id to NOT NULL. Runs only once every
/// patient has an office; refuses loudly otherwise. SQLite cannot alter
/// a column in place, so this is a guarded table rebuild.
fn tighten_patient_office_constraint(conn: &mut Connection) -> Result<usize, WorkflowError> {
    if patient_office_is_not_null(conn)? {
        return Ok(0);
    }

    let unassigned: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE office_id IS NULL",
        [],
        |row| row.get(0),
    )?;
    if unassigned > 0 {
        return Err(WorkflowError::InvariantViolation(format!(
            "{unassigned} patients still unassigned; cannot tighten office constraint"
        )));
    }

    // FK enforcement must be off for the rebuild; pragmas cannot change
    // inside a transaction.
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    let result = rebuild_patients_not_null(conn);
    conn.pragma_update(None, "foreign_keys", "ON")?;
    result?;

    tracing::info!("patients.office_id tightened to NOT NULL");
    Ok(1)
}

fn rebuild_patients_not_null(conn: &mut Connection) -> Result<(), WorkflowError> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE patients_tight (
             id TEXT PRIMARY KEY,
             first_name TEXT NOT NULL,
             last_name TEXT NOT NULL,
             payment_status TEXT NOT NULL DEFAULT 'pending',
             predetermination_status TEXT NOT NULL DEFAULT 'not_sent',
             upper_denture_type TEXT,
             lower_denture_type TEXT,
             created_at TEXT NOT NULL,
             office_id TEXT NOT NULL REFERENCES offices(id)
         );
         INSERT INTO patients_tight
             SELECT id, first_name, last_name, payment_status, predetermination_status,
                    upper_denture_type, lower_denture_type, created_at, office_id
             FROM patients;
         DROP TABLE patients;
         ALTER TABLE patients_tight RENAME TO patients;
         CREATE INDEX idx_patients_office ON patients(office_id);",
    )?;
    tx.commit()?;
    Ok(())
}

fn patient_office_is_not_null(conn: &Connection) -> Result<bool, WorkflowError> {
    let notnull: i64 = conn.query_row(
        "SELECT \"notnull\" FROM pragma_table_info('patients') WHERE name = 'office_id'",
        [],
        |row| row.get(0),
    )?;
    Ok(notnull != 0)
}
