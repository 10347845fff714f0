//! Scheduling engine for a single rota.
//!
//! [`Rota`] is the one logical owner of a rota's shifts. Reads (schedule,
//! coverage, metrics, layout) share the store's read lock; every write,
//! including sync batches, goes through the same write lock and the same
//! validated [`ShiftStore`] mutation path.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use tracing::{debug, info};

pub mod coverage;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod store;
pub mod sync;
pub mod timeline;

pub use error::{RotaError, RotaResult};
pub use metrics::{ScoreFormula, ScoreWeights, WeightedScore};
pub use store::{InMemoryStaffDirectory, ShiftStore, StaffDirectory};
pub use sync::{ReconcileOutcome, SyncReport};
pub use timeline::{Layout, TimelineWindow};

use crate::models::{
    CoverageReport, ExternalUpdate, NewShift, ShiftBlock, ShiftPatch, ShiftQuery, ShiftStatus,
    StaffMetrics, StaffingRequirement,
};
use metrics::MetricsAggregator;

/// Admin-supplied inputs. Replaced wholesale, never persisted here.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub overtime_threshold_hours: f64,
    pub coverage_bucket_minutes: u32,
    pub requirements: Vec<StaffingRequirement>,
    /// Weights of the default score formula.
    pub score_weights: WeightedScore,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            overtime_threshold_hours: metrics::DEFAULT_OVERTIME_THRESHOLD_HOURS,
            coverage_bucket_minutes: 60,
            requirements: Vec::new(),
            score_weights: WeightedScore::default(),
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.overtime_threshold_hours.is_finite() || self.overtime_threshold_hours < 0.0 {
            return Err(format!(
                "overtime threshold must be a non-negative number, got {}",
                self.overtime_threshold_hours
            ));
        }
        if self.coverage_bucket_minutes == 0 {
            return Err("coverage bucket size must be positive".into());
        }
        if let Some(r) = self.requirements.iter().find(|r| r.department.trim().is_empty()) {
            return Err(format!("staffing requirement without department: {r:?}"));
        }
        if !self.score_weights.efficiency.is_valid() || !self.score_weights.availability.is_valid() {
            return Err("score weights must be finite and non-negative".into());
        }
        Ok(())
    }
}

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

pub struct Rota {
    store: RwLock<ShiftStore>,
    directory: Arc<dyn StaffDirectory>,
    settings: RwLock<EngineSettings>,
    // replaces the weighted default for every metrics call when set
    custom_formula: Option<Arc<dyn ScoreFormula>>,
    window: TimelineWindow,
}

impl Rota {
    pub fn new(directory: Arc<dyn StaffDirectory>, settings: EngineSettings, window: TimelineWindow) -> Self {
        Self {
            store: RwLock::new(ShiftStore::new()),
            directory,
            settings: RwLock::new(settings),
            custom_formula: None,
            window,
        }
    }

    pub fn with_score_formula(mut self, formula: Arc<dyn ScoreFormula>) -> Self {
        self.custom_formula = Some(formula);
        self
    }

    pub fn has_custom_formula(&self) -> bool {
        self.custom_formula.is_some()
    }

    pub fn directory(&self) -> &Arc<dyn StaffDirectory> {
        &self.directory
    }

    pub fn window(&self) -> TimelineWindow {
        self.window
    }

    fn read(&self) -> RwLockReadGuard<'_, ShiftStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShiftStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies `edit` to a copy of the settings and commits it only if the
    /// result validates.
    pub fn update_settings<F>(&self, edit: F) -> Result<EngineSettings, String>
    where
        F: FnOnce(&mut EngineSettings),
    {
        let mut guard = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        edit(&mut next);
        next.validate()?;
        *guard = next.clone();
        info!(
            threshold = next.overtime_threshold_hours,
            bucket = next.coverage_bucket_minutes,
            requirements = next.requirements.len(),
            "engine settings updated"
        );
        Ok(next)
    }

    // ── mutation surface ────────────────────────────────────────────────────

    pub fn create_shift(&self, new: NewShift) -> RotaResult<ShiftBlock> {
        let shift = self.write().create(new, self.directory.as_ref())?;
        info!(shift_id = shift.id, staff_id = shift.staff_id, date = %shift.date, "shift created");
        Ok(shift)
    }

    pub fn update_shift(&self, id: i64, patch: &ShiftPatch) -> RotaResult<ShiftBlock> {
        let (shift, changed) = self.write().update(id, patch, self.directory.as_ref())?;
        if changed {
            info!(shift_id = id, status = %shift.status, "shift updated");
        }
        Ok(shift)
    }

    pub fn cancel_shift(&self, id: i64) -> RotaResult<ShiftBlock> {
        let shift = self.write().cancel(id, self.directory.as_ref())?;
        info!(shift_id = id, "shift cancelled");
        Ok(shift)
    }

    pub fn set_status(&self, id: i64, status: ShiftStatus) -> RotaResult<ShiftBlock> {
        self.update_shift(id, &ShiftPatch::status(status))
    }

    /// Applies an external batch under one write lock; failures are per item.
    pub fn reconcile(&self, updates: Vec<ExternalUpdate>) -> SyncReport {
        let mut store = self.write();
        let report = sync::reconcile(&mut store, self.directory.as_ref(), updates);
        info!(
            batch = %report.batch_id,
            applied = report.applied(),
            unchanged = report.unchanged(),
            rejected = report.rejected(),
            fingerprint = %store.fingerprint(),
            "reconciled external updates"
        );
        report
    }

    // ── query surface ───────────────────────────────────────────────────────

    pub fn get_shift(&self, id: i64) -> Option<ShiftBlock> {
        self.read().get(id).cloned()
    }

    pub fn schedule(&self, q: &ShiftQuery) -> Vec<ShiftBlock> {
        let rows = self.read().query(q);
        debug!(rows = rows.len(), "schedule query");
        rows
    }

    /// Coverage for `from..=to` using the configured requirements, optionally
    /// narrowed to one department and overriding the bucket size.
    ///
    /// # Panics
    ///
    /// Panics on a zero bucket size or a reversed range.
    pub fn coverage(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        department: Option<&str>,
        bucket_minutes: Option<u32>,
    ) -> CoverageReport {
        let settings = self.settings();
        let requirements: Vec<StaffingRequirement> = match department.map(norm) {
            Some(d) => settings.requirements.into_iter().filter(|r| norm(&r.department) == d).collect(),
            None => settings.requirements,
        };
        let bucket = bucket_minutes.unwrap_or(settings.coverage_bucket_minutes);

        // night shifts from the day before spill into `from`
        let q = ShiftQuery { from: from.pred_opt(), to: Some(to), active_only: true, ..Default::default() };
        let shifts = self.read().query(&q);
        coverage::analyze(&shifts, &requirements, bucket, from, to)
    }

    /// Whether `staff_id` is in the directory or owns any stored shift.
    pub fn knows_staff(&self, staff_id: i64) -> bool {
        self.directory.contains(staff_id) || self.read().shifts_for_staff(staff_id).next().is_some()
    }

    /// Metrics never fail: an id without shifts gets zeroed totals.
    pub fn staff_metrics(&self, staff_id: i64, from: NaiveDate, to: NaiveDate) -> StaffMetrics {
        let settings = self.settings();
        let formula: &dyn ScoreFormula = match &self.custom_formula {
            Some(f) => f.as_ref(),
            None => &settings.score_weights,
        };
        let aggregator = MetricsAggregator { overtime_threshold_hours: settings.overtime_threshold_hours, formula };
        let contracted = self.directory.get(staff_id).and_then(|m| m.contracted_weekly_hours);

        let store = self.read();
        aggregator.compute_for_staff(staff_id, store.shifts_for_staff(staff_id), from, to, contracted)
    }

    /// Timeline geometry of a shift in `window`, or the rota's default window.
    pub fn layout(&self, id: i64, window: Option<TimelineWindow>) -> RotaResult<Option<Layout>> {
        let store = self.read();
        let shift = store.get(id).ok_or(RotaError::UnknownShift(id))?;
        Ok(timeline::layout(shift, &window.unwrap_or(self.window)))
    }

    pub fn revision(&self) -> u64 {
        self.read().revision()
    }

    pub fn fingerprint(&self) -> String {
        self.read().fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::tests::{day, directory, new_shift};
    use crate::models::CoverageClass;
    use std::thread;

    fn rota(staff: &[i64]) -> Rota {
        Rota::new(
            Arc::new(directory(staff)),
            EngineSettings::default(),
            TimelineWindow::new(6, 22, 15).unwrap(),
        )
    }

    #[test]
    fn end_to_end_scenario() {
        let rota = rota(&[1]);
        let mut first = new_shift(1, day(3), "07:00", "15:00");
        first.status = Some(ShiftStatus::Confirmed);
        let first = rota.create_shift(first).unwrap();

        let err = rota.create_shift(new_shift(1, day(3), "14:00", "18:00")).unwrap_err();
        assert_eq!(err, RotaError::Overlap { staff_id: 1, conflicting_shift_id: first.id });

        rota.create_shift(new_shift(1, day(3), "15:00", "23:00")).unwrap();
        let m = rota.staff_metrics(1, day(3), day(3));
        assert_eq!(m.total_hours, 16.0);
    }

    #[test]
    fn coverage_uses_configured_requirements() {
        let rota = rota(&[1, 2]);
        rota.update_settings(|s| {
            s.requirements = vec![StaffingRequirement {
                department: "ward-a".into(),
                required_staff: 2,
                from: Some("07:00".parse().unwrap()),
                until: Some("15:00".parse().unwrap()),
            }];
        })
        .unwrap();
        for staff in [1, 2] {
            let mut s = new_shift(staff, day(3), "07:00", "15:00");
            s.status = Some(ShiftStatus::Confirmed);
            rota.create_shift(s).unwrap();
        }

        let report = rota.coverage(day(3), day(3), None, None);
        assert_eq!(report.cells.len(), 8);
        assert!(report.cells.iter().all(|c| c.classification == CoverageClass::Optimal));

        assert!(rota.coverage(day(3), day(3), Some("icu"), None).cells.is_empty());
        assert_eq!(rota.coverage(day(3), day(3), Some("WARD-A"), Some(240)).cells.len(), 3);
    }

    #[test]
    fn settings_are_validated_before_commit() {
        let rota = rota(&[1]);
        assert!(rota.update_settings(|s| s.coverage_bucket_minutes = 0).is_err());
        assert!(rota.update_settings(|s| s.overtime_threshold_hours = -1.0).is_err());
        assert_eq!(rota.settings(), EngineSettings::default());

        rota.update_settings(|s| s.overtime_threshold_hours = 4.0).unwrap();
        rota.create_shift(new_shift(1, day(3), "07:00", "15:00")).unwrap();
        assert_eq!(rota.staff_metrics(1, day(3), day(3)).overtime_hours, 4.0);
    }

    #[test]
    fn score_weights_commit_with_the_rest_of_the_settings() {
        let rota = rota(&[1]);
        let skewed = ScoreWeights { punctuality: 1.0, reliability: 0.0, confirmation: 0.0 };
        let broken = ScoreWeights { punctuality: f64::NAN, ..skewed };

        let rejected = rota.update_settings(|s| {
            s.overtime_threshold_hours = 10.0;
            s.score_weights.efficiency = broken;
        });
        assert!(rejected.is_err());
        assert_eq!(rota.settings(), EngineSettings::default());

        let updated = rota
            .update_settings(|s| {
                s.overtime_threshold_hours = 10.0;
                s.score_weights.efficiency = skewed;
            })
            .unwrap();
        assert_eq!(updated.score_weights.efficiency, skewed);

        // a pending shift has not been confirmed ahead of time
        rota.create_shift(new_shift(1, day(3), "07:00", "15:00")).unwrap();
        let m = rota.staff_metrics(1, day(3), day(3));
        assert_eq!(m.overtime_threshold_hours, 10.0);
        assert_eq!(m.efficiency_score, 0.0);
        assert!((m.availability_score - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn metrics_for_unknown_staff() {
        let rota = rota(&[1]);
        assert!(!rota.knows_staff(5));
        let m = rota.staff_metrics(5, day(3), day(3));
        assert_eq!(m.total_hours, 0.0);
        assert_eq!(m.shifts, Default::default());
        assert!(rota.knows_staff(1));
        assert_eq!(rota.staff_metrics(1, day(3), day(3)).total_hours, 0.0);
    }

    #[test]
    fn layout_of_stored_shift() {
        let rota = rota(&[1]);
        let s = rota.create_shift(new_shift(1, day(3), "23:00", "07:00")).unwrap();
        let l = rota.layout(s.id, None).unwrap().unwrap();
        assert_eq!(l.true_duration_minutes, 480);
        assert!(l.clipped);
        assert_eq!(rota.layout(99, None).unwrap_err(), RotaError::UnknownShift(99));
    }

    #[test]
    fn concurrent_writers_keep_the_invariant() {
        let rota = Arc::new(rota(&[1]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rota = Arc::clone(&rota);
                thread::spawn(move || rota.create_shift(new_shift(1, day(3), "07:00", "15:00")).is_ok())
            })
            .collect();
        let created = handles.into_iter().filter_map(|h| h.join().ok()).filter(|ok| *ok).count();

        // only one of the identical requests can win
        assert_eq!(created, 1);
        let q = ShiftQuery { active_only: true, ..Default::default() };
        assert_eq!(rota.schedule(&q).len(), 1);
    }
}
