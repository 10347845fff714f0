// backend/src/routes/coverage.rs

use axum::{extract::{Query, State}, Json};
use serde::Deserialize;

use crate::{
    models::{CoverageReport, StaffingRequirement, UpsertCount, MINUTES_PER_DAY},
    AppState,
};
use super::{bad_request, parse_range, ApiResult};

const MAX_RANGE_DAYS: i64 = 62;
// per department
const MAX_BUCKETS: i64 = 10_000;

#[derive(Deserialize)]
pub struct CoverageQ {
    pub from: String,
    pub to: Option<String>,
    pub department: Option<String>,
    pub bucket_minutes: Option<u32>,
}

// GET /api/v1/coverage
pub async fn get_coverage(
    State(state): State<AppState>,
    Query(q): Query<CoverageQ>,
) -> ApiResult<CoverageReport> {
    let (from, to) = parse_range(&q.from, q.to.as_deref(), MAX_RANGE_DAYS)?;
    let bucket = match q.bucket_minutes {
        Some(0) => return Err(bad_request("bucket_minutes must be positive")),
        Some(m) => m,
        None => state.rota.settings().coverage_bucket_minutes,
    };
    let buckets = ((to - from).num_days() + 1) * i64::from(MINUTES_PER_DAY.div_ceil(bucket));
    if buckets > MAX_BUCKETS {
        return Err(bad_request(format!(
            "{buckets} buckets per department exceeds {MAX_BUCKETS}; widen bucket_minutes or narrow the range"
        )));
    }
    let report = state.rota.coverage(from, to, q.department.as_deref(), Some(bucket));
    Ok(Json(report))
}

// PUT /api/v1/coverage/requirements  (replaces the whole set)
pub async fn replace_requirements(
    State(state): State<AppState>,
    Json(items): Json<Vec<StaffingRequirement>>,
) -> ApiResult<UpsertCount> {
    let upserted = items.len();
    state
        .rota
        .update_settings(|s| s.requirements = items)
        .map_err(bad_request)?;
    Ok(Json(UpsertCount { upserted }))
}

// GET /api/v1/coverage/requirements
pub async fn list_requirements(
    State(state): State<AppState>,
) -> ApiResult<Vec<StaffingRequirement>> {
    Ok(Json(state.rota.settings().requirements))
}
