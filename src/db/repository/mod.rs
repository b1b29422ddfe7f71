//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per table, all public functions re-exported here.
//! Every list query takes an [`OfficeFilter`](crate::authorization::OfficeFilter)
//! so no unscoped read path exists outside the authorization module.

mod audit;
mod consistency;
mod milestone;
mod office;
mod patient;
mod staff;
mod task;
mod task_note;

pub use audit::*;
pub use consistency::*;
pub use milestone::*;
pub use office::*;
pub use patient::*;
pub use staff::*;
pub use task::*;
pub use task_note::*;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    s.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    s.as_deref().map(parse_datetime).transpose()
}

pub(crate) fn parse_opt_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
}
