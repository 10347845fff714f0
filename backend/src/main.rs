// backend/src/main.rs

use std::sync::Arc;
use std::time::Duration;

use rota_api::{
    build_router,
    config::RotaConfig,
    db,
    engine::{sync, InMemoryStaffDirectory, Rota},
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = RotaConfig::from_env()?;

    // Staff directory: Postgres when configured, otherwise filled via the API
    let staff = Arc::new(InMemoryStaffDirectory::new());
    match &cfg.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            db::load_staff_directory(&pool, &staff).await?;
        }
        None => warn!("DATABASE_URL not set; staff directory starts empty"),
    }

    let rota = Arc::new(Rota::new(staff.clone(), cfg.engine_settings(), cfg.timeline_window()?));

    if let Some(url) = &cfg.sync_feed_url {
        let feed = sync::HttpFeed::new(url.clone(), Duration::from_secs(30))?;
        info!(feed = %url, every = ?cfg.sync_interval, "schedule sync enabled");
        tokio::spawn(sync::run_sync_loop(rota.clone(), feed, cfg.sync_interval));
    }

    let state = AppState { rota, staff };
    let api = build_router(state);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API listening on http://127.0.0.1:{}", cfg.port);

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
