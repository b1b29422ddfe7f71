use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff member on the assignable roster. Tasks historically referenced
/// staff by display name only; the roster gives those names stable ids so
/// free-text assignees can be validated at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub office_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Staff {
    pub fn new(display_name: impl Into<String>, office_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            email: None,
            office_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}
