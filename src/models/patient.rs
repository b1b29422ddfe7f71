use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DentureType, PaymentStatus, PredeterminationStatus};

/// A patient record. `office_id` is the authoritative tenancy assignment
/// for the patient and every record hanging off it. It is `Option` only
/// because rows created before multi-office existed carry NULL until the
/// backfill runs; in steady state it is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub office_id: Option<Uuid>,
    pub payment_status: PaymentStatus,
    pub predetermination_status: PredeterminationStatus,
    pub upper_denture_type: Option<DentureType>,
    pub lower_denture_type: Option<DentureType>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        office_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            office_id: Some(office_id),
            payment_status: PaymentStatus::Pending,
            predetermination_status: PredeterminationStatus::NotSent,
            upper_denture_type: None,
            lower_denture_type: None,
            created_at: Utc::now(),
        }
    }
}
