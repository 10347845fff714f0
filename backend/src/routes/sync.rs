// backend/src/routes/sync.rs

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    engine::{sync::Applied, ReconcileOutcome},
    models::{ExternalUpdate, ShiftBlock},
    AppState,
};
use super::{ApiResult, ErrorBody};

#[derive(Serialize)]
pub struct ReconcileItem {
    pub shift_id: i64,
    pub source: Option<String>,
    pub outcome: &'static str, // applied | unchanged | rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<ShiftBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl From<ReconcileOutcome> for ReconcileItem {
    fn from(o: ReconcileOutcome) -> Self {
        let ExternalUpdate { shift_id, source, .. } = o.update;
        match o.result {
            Ok(Applied { shift, changed }) => ReconcileItem {
                shift_id,
                source,
                outcome: if changed { "applied" } else { "unchanged" },
                shift: Some(shift),
                error: None,
            },
            Err(e) => ReconcileItem {
                shift_id,
                source,
                outcome: "rejected",
                shift: None,
                error: Some(ErrorBody::from(&e)),
            },
        }
    }
}

#[derive(Serialize)]
pub struct ReconcileResp {
    pub batch_id: Uuid,
    pub applied: usize,
    pub unchanged: usize,
    pub rejected: usize,
    pub items: Vec<ReconcileItem>,
}

// POST /api/v1/sync/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    Json(updates): Json<Vec<ExternalUpdate>>,
) -> ApiResult<ReconcileResp> {
    let report = state.rota.reconcile(updates);
    Ok(Json(ReconcileResp {
        batch_id: report.batch_id,
        applied: report.applied(),
        unchanged: report.unchanged(),
        rejected: report.rejected(),
        items: report.outcomes.into_iter().map(ReconcileItem::from).collect(),
    }))
}
