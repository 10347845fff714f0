// backend/src/routes/staffs.rs

use axum::{extract::State, Json};

use crate::{models::{StaffMember, UpsertCount}, AppState};
use super::{bad_request, ApiResult};

// PUT /api/v1/staffs/bulk
pub async fn bulk_upsert_staffs(
    State(state): State<AppState>,
    Json(items): Json<Vec<StaffMember>>,
) -> ApiResult<UpsertCount> {
    if let Some(m) = items.iter().find(|m| m.department.trim().is_empty()) {
        return Err(bad_request(format!("staff {} has no department", m.staff_id)));
    }
    let upserted = state.staff.upsert_many(items);
    Ok(Json(UpsertCount { upserted }))
}
