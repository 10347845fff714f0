//! Shift status state machine.
//!
//! ```text
//! pending ──> confirmed ──> no-show
//!    │            │
//!    └────────────┴──────> cancelled
//! ```
//!
//! `cancelled` and `no-show` are terminal. Re-applying the current status is
//! accepted as a no-op so externally repeated updates stay idempotent.

use super::error::{RotaError, RotaResult};
use crate::models::ShiftStatus;

pub fn allowed_targets(from: ShiftStatus) -> &'static [ShiftStatus] {
    match from {
        ShiftStatus::Pending => &[ShiftStatus::Confirmed, ShiftStatus::Cancelled],
        ShiftStatus::Confirmed => &[ShiftStatus::Cancelled, ShiftStatus::NoShow],
        ShiftStatus::Cancelled | ShiftStatus::NoShow => &[],
    }
}

pub fn check_transition(from: ShiftStatus, to: ShiftStatus) -> RotaResult<()> {
    if from == to || allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(RotaError::InvalidTransition { from, to })
    }
}

/// Status a new shift starts in: pending unless created already confirmed.
pub fn initial_status(requested: Option<ShiftStatus>) -> RotaResult<ShiftStatus> {
    match requested {
        None | Some(ShiftStatus::Pending) => Ok(ShiftStatus::Pending),
        Some(ShiftStatus::Confirmed) => Ok(ShiftStatus::Confirmed),
        Some(other) => Err(RotaError::InvalidTransition { from: ShiftStatus::Pending, to: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ShiftStatus::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(check_transition(Pending, Confirmed).is_ok());
        assert!(check_transition(Pending, Cancelled).is_ok());
        assert!(check_transition(Confirmed, Cancelled).is_ok());
        assert!(check_transition(Confirmed, NoShow).is_ok());
    }

    #[test]
    fn no_show_requires_confirmation() {
        assert_eq!(
            check_transition(Pending, NoShow),
            Err(RotaError::InvalidTransition { from: Pending, to: NoShow })
        );
    }

    #[test]
    fn terminal_states_stay_put() {
        for from in [Cancelled, NoShow] {
            for to in [Pending, Confirmed] {
                assert!(check_transition(from, to).is_err());
            }
        }
        assert!(check_transition(Cancelled, NoShow).is_err());
        assert!(check_transition(NoShow, Cancelled).is_err());
        assert!(check_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn same_status_is_a_no_op() {
        for s in [Pending, Confirmed, Cancelled, NoShow] {
            assert!(check_transition(s, s).is_ok());
        }
    }

    #[test]
    fn creation_status() {
        assert_eq!(initial_status(None), Ok(Pending));
        assert_eq!(initial_status(Some(Confirmed)), Ok(Confirmed));
        assert!(initial_status(Some(NoShow)).is_err());
        assert!(initial_status(Some(Cancelled)).is_err());
    }
}
