use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::RotaError;

pub mod health;
pub mod shifts;
pub mod staffs;
pub mod coverage;
pub mod metrics;
pub mod settings;
pub mod sync;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_shift_id: Option<i64>,
}

impl From<&RotaError> for ErrorBody {
    fn from(e: &RotaError) -> Self {
        ErrorBody {
            kind: e.kind(),
            message: e.to_string(),
            conflicting_shift_id: e.conflicting_shift_id(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<RotaError> for ApiError {
    fn from(e: RotaError) -> Self {
        let status = match &e {
            RotaError::InvalidTimeRange(_) | RotaError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            RotaError::UnknownStaff(_) | RotaError::UnknownShift(_) => StatusCode::NOT_FOUND,
            RotaError::Overlap { .. }
            | RotaError::ShiftClosed { .. }
            | RotaError::ReconciliationConflict { .. } => StatusCode::CONFLICT,
        };
        ApiError { status, body: ErrorBody::from(&e) }
    }
}

// Common error mapper for request validation
pub fn bad_request<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody { kind: "bad_request", message: e.to_string(), conflicting_shift_id: None },
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub(crate) fn parse_day(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map_err(|e| bad_request(format!("invalid date '{}': {}", s, e)))
}

/// `from` is required; `to` defaults to `from`. Rejects reversed or overlong ranges.
pub(crate) fn parse_range(from: &str, to: Option<&str>, max_days: i64) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let from = parse_day(from)?;
    let to = to.map(parse_day).transpose()?.unwrap_or(from);
    if to < from {
        return Err(bad_request(format!("range end {to} is before start {from}")));
    }
    if (to - from).num_days() >= max_days {
        return Err(bad_request(format!("range {from}..{to} exceeds {max_days} days")));
    }
    Ok((from, to))
}
