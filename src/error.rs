use thiserror::Error;

use crate::db::DatabaseError;

/// Operation-level error taxonomy. Validation and access failures are
/// client-correctable and never retried; an invariant violation is fatal
/// to the request, signals a data-repair need (re-run the backfill), and
/// is logged distinctly from an ordinary not-found.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Access denied")]
    AccessDenied,

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Data inconsistency, contact an administrator: {0}")]
    InvariantViolation(String),

    #[error("An office named '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Raw store errors fold into the database arm so operation code can use
/// `?` on direct SQL (transactions, pragmas) the same as on repository
/// calls.
impl From<rusqlite::Error> for WorkflowError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

impl WorkflowError {
    pub(crate) fn validation(field: &str, reason: &str) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}
