// backend/src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod routes;

use engine::{InMemoryStaffDirectory, Rota};

#[derive(Clone)]
pub struct AppState {
    pub rota: Arc<Rota>,
    // concrete handle so the admin surface can upsert entries
    pub staff: Arc<InMemoryStaffDirectory>,
}

pub fn build_router(state: AppState) -> Router {
    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // health
        .route("/health", get(routes::health::health))
        // schedule query + mutation surface
        .route(
            "/api/v1/shifts",
            post(routes::shifts::create_shift).get(routes::shifts::list_shifts),
        )
        .route(
            "/api/v1/shifts/:id",
            get(routes::shifts::get_shift)
                .patch(routes::shifts::patch_shift)
                .delete(routes::shifts::cancel_shift),
        )
        .route("/api/v1/shifts/:id/confirm", post(routes::shifts::confirm_shift))
        .route("/api/v1/shifts/:id/no-show", post(routes::shifts::mark_no_show))
        .route("/api/v1/shifts/:id/layout", get(routes::shifts::get_layout))
        // coverage
        .route("/api/v1/coverage", get(routes::coverage::get_coverage))
        .route(
            "/api/v1/coverage/requirements",
            put(routes::coverage::replace_requirements).get(routes::coverage::list_requirements),
        )
        // staff directory + metrics
        .route("/api/v1/staffs/bulk", put(routes::staffs::bulk_upsert_staffs))
        .route("/api/v1/staffs/:id/metrics", get(routes::metrics::get_staff_metrics))
        // admin configuration
        .route(
            "/api/v1/settings",
            get(routes::settings::get_settings).put(routes::settings::put_settings),
        )
        // external feed
        .route("/api/v1/sync/reconcile", post(routes::sync::reconcile))
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
