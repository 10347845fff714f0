use thiserror::Error;

use crate::models::ShiftStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RotaError {
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("shift overlaps existing shift {conflicting_shift_id} for staff {staff_id}")]
    Overlap { staff_id: i64, conflicting_shift_id: i64 },

    #[error("staff {0} is not in the staff directory")]
    UnknownStaff(i64),

    #[error("shift {0} does not exist")]
    UnknownShift(i64),

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: ShiftStatus, to: ShiftStatus },

    #[error("shift {shift_id} is {status} and can no longer be edited")]
    ShiftClosed { shift_id: i64, status: ShiftStatus },

    #[error("external update for shift {shift_id} rejected: {cause}")]
    ReconciliationConflict { shift_id: i64, cause: Box<RotaError> },
}

impl RotaError {
    pub fn kind(&self) -> &'static str {
        match self {
            RotaError::InvalidTimeRange(_) => "invalid_time_range",
            RotaError::Overlap { .. } => "overlap",
            RotaError::UnknownStaff(_) => "unknown_staff",
            RotaError::UnknownShift(_) => "unknown_shift",
            RotaError::InvalidTransition { .. } => "invalid_transition",
            RotaError::ShiftClosed { .. } => "shift_closed",
            RotaError::ReconciliationConflict { .. } => "reconciliation_conflict",
        }
    }

    /// Shift the caller has to resolve against, when there is one.
    pub fn conflicting_shift_id(&self) -> Option<i64> {
        match self {
            RotaError::Overlap { conflicting_shift_id, .. } => Some(*conflicting_shift_id),
            RotaError::ReconciliationConflict { cause, .. } => cause.conflicting_shift_id(),
            _ => None,
        }
    }
}

pub type RotaResult<T> = Result<T, RotaError>;
