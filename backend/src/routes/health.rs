// backend/src/routes/health.rs

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResp {
    pub status: &'static str,
    pub version: &'static str,
    pub revision: u64,
    pub staff: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok",
        version: "v1",
        revision: state.rota.revision(),
        staff: state.staff.len(),
    })
}
