use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated identity attached to every request by the session
/// layer. The core never authenticates; it only authorizes against this.
///
/// Invariant: a user without `can_view_all_offices` must carry a non-null
/// `office_id` — the constructors enforce this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub office_id: Option<Uuid>,
    pub can_view_all_offices: bool,
}

impl AuthenticatedUser {
    /// A user scoped to a single office.
    pub fn scoped(email: impl Into<String>, display_name: impl Into<String>, office_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            office_id: Some(office_id),
            can_view_all_offices: false,
        }
    }

    /// A head-office user with cross-tenant visibility.
    pub fn head_office(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            office_id: None,
            can_view_all_offices: true,
        }
    }
}
