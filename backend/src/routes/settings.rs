// backend/src/routes/settings.rs

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{EngineSettings, WeightedScore},
    AppState,
};
use super::{bad_request, ApiResult};

#[derive(Deserialize)]
pub struct SettingsBody {
    pub overtime_threshold_hours: Option<f64>,
    pub coverage_bucket_minutes: Option<u32>,
    pub score_weights: Option<WeightedScore>,
}

#[derive(Serialize)]
pub struct SettingsResp {
    pub overtime_threshold_hours: f64,
    pub coverage_bucket_minutes: u32,
    pub requirements: usize,
    pub score_weights: WeightedScore,
    pub custom_score_formula: bool, // weights are ignored when true
}

fn to_resp(state: &AppState, s: EngineSettings) -> SettingsResp {
    SettingsResp {
        overtime_threshold_hours: s.overtime_threshold_hours,
        coverage_bucket_minutes: s.coverage_bucket_minutes,
        requirements: s.requirements.len(),
        score_weights: s.score_weights,
        custom_score_formula: state.rota.has_custom_formula(),
    }
}

// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<SettingsResp> {
    let settings = state.rota.settings();
    Ok(Json(to_resp(&state, settings)))
}

// PUT /api/v1/settings  (all fields commit together or not at all)
pub async fn put_settings(
    State(state): State<AppState>,
    Json(b): Json<SettingsBody>,
) -> ApiResult<SettingsResp> {
    let updated = state
        .rota
        .update_settings(|s| {
            if let Some(t) = b.overtime_threshold_hours {
                s.overtime_threshold_hours = t;
            }
            if let Some(m) = b.coverage_bucket_minutes {
                s.coverage_bucket_minutes = m;
            }
            if let Some(w) = b.score_weights {
                s.score_weights = w;
            }
        })
        .map_err(bad_request)?;
    Ok(Json(to_resp(&state, updated)))
}
