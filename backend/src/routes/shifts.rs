// backend/src/routes/shifts.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{Layout, RotaError},
    models::{NewShift, ShiftBlock, ShiftPatch, ShiftQuery, ShiftStatus},
    AppState,
};
use super::{bad_request, parse_day, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct ListQ {
    pub staff_ids: Option<String>, // comma separated
    pub from: Option<String>,
    pub to: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

fn parse_ids(raw: &str) -> Result<Vec<i64>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| bad_request(format!("invalid staff id '{s}'"))))
        .collect()
}

// GET /api/v1/shifts
pub async fn list_shifts(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> ApiResult<Vec<ShiftBlock>> {
    let query = ShiftQuery {
        staff_ids: q.staff_ids.as_deref().map(parse_ids).transpose()?,
        from: q.from.as_deref().map(parse_day).transpose()?,
        to: q.to.as_deref().map(parse_day).transpose()?,
        department: q.department,
        active_only: q.active_only,
    };
    Ok(Json(state.rota.schedule(&query)))
}

// POST /api/v1/shifts
pub async fn create_shift(
    State(state): State<AppState>,
    Json(b): Json<NewShift>,
) -> ApiResult<ShiftBlock> {
    Ok(Json(state.rota.create_shift(b)?))
}

// GET /api/v1/shifts/:id
pub async fn get_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ShiftBlock> {
    let shift = state.rota.get_shift(id).ok_or(RotaError::UnknownShift(id))?;
    Ok(Json(shift))
}

// PATCH /api/v1/shifts/:id
pub async fn patch_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<ShiftPatch>,
) -> ApiResult<ShiftBlock> {
    Ok(Json(state.rota.update_shift(id, &b)?))
}

// DELETE /api/v1/shifts/:id  (soft delete)
pub async fn cancel_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ShiftBlock> {
    Ok(Json(state.rota.cancel_shift(id)?))
}

// POST /api/v1/shifts/:id/confirm
pub async fn confirm_shift(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ShiftBlock> {
    Ok(Json(state.rota.set_status(id, ShiftStatus::Confirmed)?))
}

// POST /api/v1/shifts/:id/no-show
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ShiftBlock> {
    Ok(Json(state.rota.set_status(id, ShiftStatus::NoShow)?))
}

#[derive(Deserialize)]
pub struct LayoutQ {
    pub window_start_hour: Option<u32>,
    pub window_end_hour: Option<u32>,
}

#[derive(Serialize)]
pub struct LayoutResp {
    pub shift_id: i64,
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    pub layout: Option<Layout>, // None when nothing is visible
}

// GET /api/v1/shifts/:id/layout
pub async fn get_layout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(q): Query<LayoutQ>,
) -> ApiResult<LayoutResp> {
    let default = state.rota.window();
    let window = match (q.window_start_hour, q.window_end_hour) {
        (None, None) => default,
        (start, end) => default.with_hours(
            start.unwrap_or(default.start_hour()),
            end.unwrap_or(default.end_hour()),
        )?,
    };
    let layout = state.rota.layout(id, Some(window))?;
    Ok(Json(LayoutResp {
        shift_id: id,
        window_start_hour: window.start_hour(),
        window_end_hour: window.end_hour(),
        layout,
    }))
}
