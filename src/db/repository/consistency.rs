use rusqlite::Connection;

use crate::db::DatabaseError;

/// Child tables whose office_id must mirror the parent patient's.
/// task_notes join through their task to reach the patient.
const DIRECT_CHILD_TABLES: &[&str] = &[
    "tasks",
    "milestones",
    "clinical_notes",
    "lab_prescriptions",
    "patient_files",
    "appointments",
];

/// A single tenancy issue detected by the checker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyIssue {
    pub category: String,
    pub table: String,
    pub record_id: Option<String>,
    pub description: String,
}

/// Result of a tenancy consistency sweep.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<ConsistencyIssue>,
    pub patients_checked: i64,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Sweep the database for tenancy-derivation violations.
///
/// Detects:
/// - Patients with a null office (backfill incomplete)
/// - Child records whose office_id is null or differs from the parent's
/// - Completed tasks or milestones missing an actor or timestamp
///
/// Every issue found means "re-run the backfill", never "patch at read
/// time" — callers must not repair rows based on this report.
pub fn check_tenant_consistency(conn: &Connection) -> Result<ConsistencyReport, DatabaseError> {
    let mut issues = Vec::new();

    let patients_checked: i64 =
        conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;

    let mut stmt = conn.prepare("SELECT id FROM patients WHERE office_id IS NULL")?;
    let unassigned: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    for id in unassigned {
        issues.push(ConsistencyIssue {
            category: "unassigned_patient".into(),
            table: "patients".into(),
            record_id: Some(id),
            description: "Patient has no office assignment".into(),
        });
    }

    for table in DIRECT_CHILD_TABLES {
        let sql = format!(
            "SELECT c.id FROM {table} c
             JOIN patients p ON p.id = c.patient_id
             WHERE c.office_id IS NULL OR c.office_id != p.office_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mismatched: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        for id in mismatched {
            issues.push(ConsistencyIssue {
                category: "office_mismatch".into(),
                table: (*table).into(),
                record_id: Some(id),
                description: "Record office differs from parent patient".into(),
            });
        }
    }

    // Notes reach the patient through their task.
    let mut stmt = conn.prepare(
        "SELECT n.id FROM task_notes n
         JOIN tasks t ON t.id = n.task_id
         JOIN patients p ON p.id = t.patient_id
         WHERE n.office_id IS NULL OR n.office_id != p.office_id",
    )?;
    let mismatched_notes: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    for id in mismatched_notes {
        issues.push(ConsistencyIssue {
            category: "office_mismatch".into(),
            table: "task_notes".into(),
            record_id: Some(id),
            description: "Note office differs from its task's patient".into(),
        });
    }

    for (table, what) in [("tasks", "task"), ("milestones", "milestone")] {
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {table}
                 WHERE status = 'completed' AND (completed_by IS NULL OR completed_at IS NULL)"
            ),
            [],
            |row| row.get(0),
        )?;
        if count > 0 {
            issues.push(ConsistencyIssue {
                category: "anonymous_completion".into(),
                table: table.into(),
                record_id: None,
                description: format!("{count} completed {what}(s) missing actor or timestamp"),
            });
        }
    }

    if !issues.is_empty() {
        tracing::error!(
            issues = issues.len(),
            "tenancy consistency check failed; re-run the backfill"
        );
    }

    Ok(ConsistencyReport {
        issues,
        patients_checked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_office, insert_patient};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Office, Patient};

    #[test]
    fn clean_database_reports_no_issues() {
        let conn = open_memory_database().unwrap();
        let office = Office::new("Dentures Direct");
        insert_office(&conn, &office).unwrap();
        insert_patient(&conn, &Patient::new("June", "Abara", office.id)).unwrap();

        let report = check_tenant_consistency(&conn).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.patients_checked, 1);
    }

    #[test]
    fn mismatched_child_office_is_flagged() {
        let conn = open_memory_database().unwrap();
        let o1 = Office::new("Dentures Direct");
        let o2 = Office::new("Westside Denture Clinic");
        insert_office(&conn, &o1).unwrap();
        insert_office(&conn, &o2).unwrap();
        let patient = Patient::new("June", "Abara", o1.id);
        insert_patient(&conn, &patient).unwrap();

        // Forge a task under the wrong office, bypassing the derivation.
        conn.execute(
            "INSERT INTO tasks (id, patient_id, office_id, title, assignee, priority,
             status, created_by, created_at)
             VALUES ('t1', ?1, ?2, 'Reline', 'Michael', 'normal', 'open', 'admin', ?3)",
            rusqlite::params![
                patient.id.to_string(),
                o2.id.to_string(),
                chrono::Utc::now().to_rfc3339()
            ],
        )
        .unwrap();

        let report = check_tenant_consistency(&conn).unwrap();
        assert!(!report.is_clean());
        assert!(report
            .issues
            .iter()
            .any(|i| i.category == "office_mismatch" && i.table == "tasks"));
    }
}
