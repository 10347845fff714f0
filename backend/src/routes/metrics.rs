// backend/src/routes/metrics.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;

use crate::{engine::RotaError, models::StaffMetrics, AppState};
use super::{parse_range, ApiResult};

const MAX_PERIOD_DAYS: i64 = 366;

#[derive(Deserialize)]
pub struct MetricsQ {
    pub from: String,
    pub to: Option<String>,
}

// GET /api/v1/staffs/:id/metrics
pub async fn get_staff_metrics(
    State(state): State<AppState>,
    Path(staff_id): Path<i64>,
    Query(q): Query<MetricsQ>,
) -> ApiResult<StaffMetrics> {
    let (from, to) = parse_range(&q.from, q.to.as_deref(), MAX_PERIOD_DAYS)?;
    // the aggregator zero-fills unknown ids; the surface reports them
    if !state.rota.knows_staff(staff_id) {
        return Err(RotaError::UnknownStaff(staff_id).into());
    }
    Ok(Json(state.rota.staff_metrics(staff_id, from, to)))
}
