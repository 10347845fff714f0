//! ScheduleSync: merges externally reported shift changes into the store.
//!
//! Every item goes through [`ShiftStore::update`], the same path manual
//! edits use. A rejected item is reported on its own and never aborts the
//! rest of the batch. Re-applying a batch leaves the store as it was after
//! the first application.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{RotaError, RotaResult};
use super::store::{ShiftStore, StaffDirectory};
use super::Rota;
use crate::models::{ExternalUpdate, ShiftBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub shift: ShiftBlock,
    /// False when the store already matched the update.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub update: ExternalUpdate,
    pub result: RotaResult<Applied>,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<ReconcileOutcome>,
}

impl SyncReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(Applied { changed: true, .. })))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(Applied { changed: false, .. })))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

pub fn reconcile(
    store: &mut ShiftStore,
    directory: &dyn StaffDirectory,
    updates: Vec<ExternalUpdate>,
) -> SyncReport {
    let batch_id = Uuid::new_v4();
    let outcomes = updates
        .into_iter()
        .map(|update| {
            let result = store
                .update(update.shift_id, &update.patch, directory)
                .map(|(shift, changed)| Applied { shift, changed })
                .map_err(|cause| {
                    warn!(
                        batch = %batch_id,
                        shift_id = update.shift_id,
                        source = update.source.as_deref().unwrap_or("unknown"),
                        kind = cause.kind(),
                        "external update rejected: {cause}"
                    );
                    RotaError::ReconciliationConflict { shift_id: update.shift_id, cause: Box::new(cause) }
                });
            ReconcileOutcome { update, result }
        })
        .collect();
    SyncReport { batch_id, outcomes }
}

// ─────────────────────────────────────────────────────────────────────────────
// Periodic worker
// ─────────────────────────────────────────────────────────────────────────────

/// Where the periodic worker gets its batches from.
pub trait UpdateSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn fetch(&self) -> impl Future<Output = anyhow::Result<Vec<ExternalUpdate>>> + Send;
}

/// Pulls pending external updates from an HTTP endpoint returning a JSON
/// array of [`ExternalUpdate`].
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building sync feed client")?;
        Ok(Self { client, url: url.into() })
    }
}

impl UpdateSource for HttpFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> anyhow::Result<Vec<ExternalUpdate>> {
        let updates = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()?
            .json()
            .await
            .context("decoding external updates")?;
        Ok(updates)
    }
}

/// One fetch-and-apply round.
pub async fn sync_once<S: UpdateSource>(rota: &Rota, source: &S) -> anyhow::Result<SyncReport> {
    let updates = source.fetch().await?;
    if updates.is_empty() {
        debug!(feed = source.name(), "no external updates");
    }
    Ok(rota.reconcile(updates))
}

/// Runs [`sync_once`] every `interval` until the task is dropped. Feed
/// failures are logged and retried on the next tick.
pub async fn run_sync_loop<S: UpdateSource>(rota: Arc<Rota>, source: S, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = sync_once(&rota, &source).await {
            warn!(feed = source.name(), "schedule sync failed: {e:#}");
        }
    }
}
