//! Startup configuration: the office set, the assignable-staff roster,
//! and the backfill's default office. Loaded once and passed in
//! explicitly so tests can substitute fixtures.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APP_NAME: &str = "Dentaflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// One roster entry. `office` names an entry in `offices`; a member
/// without one is assigned by the backfill's staff-promotion step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffSeed {
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Offices to create-if-absent at seed time.
    pub offices: Vec<String>,
    /// Where pre-tenancy records land during backfill. An explicit
    /// operational parameter — nothing in the data implies it.
    pub default_office: String,
    /// Accounts granted cross-office visibility during backfill.
    #[serde(default)]
    pub head_office_emails: Vec<String>,
    #[serde(default)]
    pub staff: Vec<StaffSeed>,
}

impl SeedConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_office.trim().is_empty() {
            return Err(ConfigError::Invalid("default_office must be set".into()));
        }
        if !self
            .offices
            .iter()
            .any(|o| o.eq_ignore_ascii_case(&self.default_office))
        {
            return Err(ConfigError::Invalid(format!(
                "default_office '{}' is not in the office list",
                self.default_office
            )));
        }
        Ok(())
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            offices: vec![
                "Dentures Direct".into(),
                "Westside Denture Clinic".into(),
                "Airdrie Denture Centre".into(),
            ],
            default_office: "Dentures Direct".into(),
            head_office_emails: vec!["michael@denturesdirect.example".into()],
            staff: vec![
                StaffSeed {
                    display_name: "Michael".into(),
                    email: Some("michael@denturesdirect.example".into()),
                    office: Some("Dentures Direct".into()),
                },
                StaffSeed {
                    display_name: "Sandra".into(),
                    email: Some("sandra@denturesdirect.example".into()),
                    office: Some("Dentures Direct".into()),
                },
                StaffSeed {
                    display_name: "Priya".into(),
                    email: None,
                    office: Some("Westside Denture Clinic".into()),
                },
            ],
        }
    }
}
