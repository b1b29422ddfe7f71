//! Dentaflow core: multi-office tenancy and the treatment task workflow
//! for a denture-clinic practice.
//!
//! The tenancy rule everything else hangs off: a patient belongs to
//! exactly one office, and every patient-scoped record (tasks, notes,
//! milestones, files, appointments) carries a copy of that office that
//! must always match the parent's. [`backfill`] retrofits the rule onto
//! pre-tenancy data; [`authorization`] enforces it on every read and
//! write; [`workflow`] drives tasks and milestones inside it.

pub mod authorization;
pub mod backfill;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod models;
pub mod workflow;

pub use error::WorkflowError;
