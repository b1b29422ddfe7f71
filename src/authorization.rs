//! Office-scoping access policy.
//!
//! Single decision point for every office-scoped operation: a request
//! either targets the user's own office or carries cross-office
//! capability. Default-deny. Read paths widen past one office only by
//! holding an [`OfficeFilter`] in the all-offices scope, and that value
//! is constructible only through [`resolve_effective_office_filter`] —
//! there is no secondary enforcement layer behind it.

use uuid::Uuid;

use crate::error::WorkflowError;
use crate::models::AuthenticatedUser;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Why access was granted (or denied) — for audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// User operating inside their own office.
    OwnOffice,
    /// Cross-office capability (head-office staff).
    AllOffices,
    /// No matching rule — access denied.
    Denied,
}

/// Result of an authorization check. Never an error: callers must check
/// `allowed` and translate a denial themselves.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

/// The effective office scope of a read query. Opaque on purpose: the
/// all-offices scope cannot be built outside this module, so repository
/// list functions (which all take one of these) have no reachable
/// unscoped path without a decision having been made here first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficeFilter {
    scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    AllOffices,
    Office(Uuid),
}

impl OfficeFilter {
    /// The single office this filter restricts to, or `None` for the
    /// cross-office scope.
    pub fn office_id(&self) -> Option<Uuid> {
        match self.scope {
            Scope::AllOffices => None,
            Scope::Office(id) => Some(id),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════════════════════

/// Can `user` perform an operation against a record in `target_office`?
///
/// Allow when the user holds cross-office capability or the target is
/// their own office; deny otherwise. `operation` is only for the log
/// line — the rule does not vary by operation.
pub fn authorize(user: &AuthenticatedUser, target_office: Uuid, operation: &str) -> AccessDecision {
    if user.can_view_all_offices {
        return AccessDecision::allow(AccessReason::AllOffices);
    }
    if user.office_id == Some(target_office) {
        return AccessDecision::allow(AccessReason::OwnOffice);
    }
    tracing::warn!(
        user = %user.email,
        %target_office,
        operation,
        "cross-office access denied"
    );
    AccessDecision::deny()
}

/// Resolve the office scope a read query actually runs under.
///
/// A restricted user is forced to their own office no matter what office
/// the request asked for — parameter manipulation cannot widen the
/// query. A cross-office user gets the office they asked for, or the
/// all-offices scope when they asked for none.
///
/// A restricted user without an office affiliation is a broken session
/// object; that surfaces as an invariant violation (fatal to the
/// request, not the process), never as an unscoped filter.
pub fn resolve_effective_office_filter(
    user: &AuthenticatedUser,
    requested_office: Option<Uuid>,
) -> Result<OfficeFilter, WorkflowError> {
    if user.can_view_all_offices {
        return Ok(OfficeFilter {
            scope: match requested_office {
                Some(id) => Scope::Office(id),
                None => Scope::AllOffices,
            },
        });
    }

    let Some(own) = user.office_id else {
        return Err(WorkflowError::InvariantViolation(format!(
            "restricted user {} has no office affiliation",
            user.email
        )));
    };
    if let Some(requested) = requested_office {
        if requested != own {
            tracing::warn!(
                user = %user.email,
                %requested,
                "requested office ignored; filter forced to user's own office"
            );
        }
    }
    Ok(OfficeFilter {
        scope: Scope::Office(own),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_office_is_allowed() {
        let office = Uuid::new_v4();
        let user = AuthenticatedUser::scoped("m@dd.example", "Michael", office);
        let decision = authorize(&user, office, "task.create");
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::OwnOffice);
    }

    #[test]
    fn other_office_is_denied() {
        let user = AuthenticatedUser::scoped("m@dd.example", "Michael", Uuid::new_v4());
        let decision = authorize(&user, Uuid::new_v4(), "task.reassign");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Denied);
    }

    #[test]
    fn head_office_allowed_everywhere() {
        let user = AuthenticatedUser::head_office("hq@dd.example", "HQ");
        assert!(authorize(&user, Uuid::new_v4(), "patient.read").allowed);
    }

    #[test]
    fn restricted_user_cannot_widen_filter() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = AuthenticatedUser::scoped("m@dd.example", "Michael", own);

        let filter = resolve_effective_office_filter(&user, Some(other)).unwrap();
        assert_eq!(filter.office_id(), Some(own));
    }

    #[test]
    fn head_office_defaults_to_all_offices() {
        let user = AuthenticatedUser::head_office("hq@dd.example", "HQ");
        let filter = resolve_effective_office_filter(&user, None).unwrap();
        assert_eq!(filter.office_id(), None);

        let one = Uuid::new_v4();
        let narrowed = resolve_effective_office_filter(&user, Some(one)).unwrap();
        assert_eq!(narrowed.office_id(), Some(one));
    }

    #[test]
    fn restricted_user_without_office_is_an_invariant_violation() {
        // A session layer can hand over any shape it can serialize;
        // a restricted user with no office must fail the request, not
        // the process, and must never widen to an unscoped filter.
        let user: AuthenticatedUser = serde_json::from_str(
            r#"{
                "id": "7f3c1e08-52bd-4898-b1f5-9c2f4b6a0d11",
                "email": "broken@dd.example",
                "display_name": "Broken",
                "office_id": null,
                "can_view_all_offices": false
            }"#,
        )
        .unwrap();

        let result = resolve_effective_office_filter(&user, None);
        assert!(matches!(result, Err(WorkflowError::InvariantViolation(_))));
    }
}
