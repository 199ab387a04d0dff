//! Shift/application state machine. The rules live here as pure planning
//! code: given the current application and shift, decide which writes a
//! requested transition implies. The handler executes the plan; the two
//! writes are separate single-item updates, not a transaction, so a failure
//! after the application update surfaces as Upstream and leaves the shift
//! for reconciliation.

use crate::api::ApiError;
use crate::types::{ApplicationStatus, Shift, ShiftApplication, ShiftStatus};

/// The shift-side effect of accepting an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftAssignment {
    pub shift_id: String,
    pub assignee_urn: String,
    pub new_status: ShiftStatus,
}

/// A validated transition: what to write, in order.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub new_status: ApplicationStatus,
    pub shift_update: Option<ShiftAssignment>,
}

/// Validate a requested accept/reject against current state.
///
/// An application moves out of `pending` exactly once; re-deciding a decided
/// application is a conflict. Accepting against an already-filled shift is
/// also a conflict: the shift's assignment belongs to whoever was accepted
/// first.
pub fn plan_status_change(
    application: &ShiftApplication,
    shift: &Shift,
    requested: ApplicationStatus,
) -> Result<StatusChange, ApiError> {
    if !requested.is_terminal() {
        return Err(ApiError::validation(
            "Invalid shift application status",
            vec!["status"],
        ));
    }

    if application.status.is_terminal() {
        return Err(ApiError::conflict(
            "Shift application has already been decided",
            application.status.as_str(),
        ));
    }

    let shift_update = match requested {
        ApplicationStatus::Accepted => {
            if shift.status == ShiftStatus::Filled {
                return Err(ApiError::conflict(
                    "Shift is already filled",
                    shift.status.as_str(),
                ));
            }
            Some(ShiftAssignment {
                shift_id: shift.id.clone(),
                assignee_urn: application.owner_urn.clone(),
                new_status: ShiftStatus::Filled,
            })
        }
        _ => None,
    };

    Ok(StatusChange {
        new_status: requested,
        shift_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_application() -> ShiftApplication {
        ShiftApplication {
            id: "a1".to_string(),
            shift_id: "s1".to_string(),
            owner_urn: "urn:user:u1".to_string(),
            description: "I can help".to_string(),
            status: ApplicationStatus::Pending,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    fn shift_with_status(status: ShiftStatus) -> Shift {
        Shift {
            id: "s1".to_string(),
            name: "Dock shift".to_string(),
            owner_urn: "urn:org:acme".to_string(),
            status,
            location: String::new(),
            description: String::new(),
            assigned_to: vec![],
            start_time_ms: 0,
            end_time_ms: 0,
            start_date_iso: String::new(),
            end_date_iso: String::new(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn accepting_a_pending_application_fills_the_shift() {
        let plan = plan_status_change(
            &pending_application(),
            &shift_with_status(ShiftStatus::Open),
            ApplicationStatus::Accepted,
        )
        .unwrap();

        assert_eq!(plan.new_status, ApplicationStatus::Accepted);
        let update = plan.shift_update.unwrap();
        assert_eq!(update.shift_id, "s1");
        assert_eq!(update.assignee_urn, "urn:user:u1");
        assert_eq!(update.new_status, ShiftStatus::Filled);
    }

    #[test]
    fn rejecting_leaves_the_shift_untouched() {
        let plan = plan_status_change(
            &pending_application(),
            &shift_with_status(ShiftStatus::Applied),
            ApplicationStatus::Rejected,
        )
        .unwrap();

        assert_eq!(plan.new_status, ApplicationStatus::Rejected);
        assert!(plan.shift_update.is_none());
    }

    #[test]
    fn accepting_against_a_filled_shift_conflicts() {
        let err = plan_status_change(
            &pending_application(),
            &shift_with_status(ShiftStatus::Filled),
            ApplicationStatus::Accepted,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[test]
    fn rejecting_against_a_filled_shift_is_still_allowed() {
        let plan = plan_status_change(
            &pending_application(),
            &shift_with_status(ShiftStatus::Filled),
            ApplicationStatus::Rejected,
        )
        .unwrap();
        assert!(plan.shift_update.is_none());
    }

    #[test]
    fn a_decided_application_cannot_move_again() {
        let mut application = pending_application();
        application.status = ApplicationStatus::Accepted;

        let err = plan_status_change(
            &application,
            &shift_with_status(ShiftStatus::Filled),
            ApplicationStatus::Rejected,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[test]
    fn pending_is_not_a_requestable_target() {
        let err = plan_status_change(
            &pending_application(),
            &shift_with_status(ShiftStatus::Open),
            ApplicationStatus::Pending,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
