//! Per-staff hour totals, overtime and composite scores.
//!
//! Hours always come from [`duration_minutes`], never from timeline layout,
//! and overnight shifts count towards the date they start on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::timeline::duration_minutes;
use crate::models::{ShiftBlock, ShiftCounts, ShiftStatus, StaffMetrics};

pub const DEFAULT_OVERTIME_THRESHOLD_HOURS: f64 = 37.5;

/// Normalised behaviour factors, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Share of due shifts that were confirmed ahead of time rather than left pending.
    pub punctuality: f64,
    /// Confirmed shifts actually worked (not marked no-show).
    pub reliability: f64,
    /// Confirmed versus cancelled.
    pub confirmation_ratio: f64,
}

fn ratio(n: u32, d: u32) -> f64 {
    // no history is no evidence against the staff member
    if d == 0 {
        1.0
    } else {
        n as f64 / d as f64
    }
}

impl ScoreInputs {
    pub fn from_counts(c: &ShiftCounts) -> Self {
        let committed = c.confirmed + c.no_show;
        Self {
            punctuality: ratio(committed, committed + c.pending),
            reliability: ratio(c.confirmed, committed),
            confirmation_ratio: ratio(c.confirmed, c.confirmed + c.cancelled),
        }
    }
}

/// Turns [`ScoreInputs`] into 0..100 scores. Deployments plug in their own.
pub trait ScoreFormula: Send + Sync {
    fn efficiency(&self, inputs: &ScoreInputs) -> f64;
    fn availability(&self, inputs: &ScoreInputs) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub punctuality: f64,
    pub reliability: f64,
    pub confirmation: f64,
}

impl ScoreWeights {
    pub fn equal() -> Self {
        Self { punctuality: 1.0, reliability: 1.0, confirmation: 1.0 }
    }

    pub fn is_valid(&self) -> bool {
        let all = [self.punctuality, self.reliability, self.confirmation];
        all.iter().all(|w| w.is_finite() && *w >= 0.0)
    }

    /// Weighted mean scaled to 0..100; all-zero weights score 0.
    pub fn apply(&self, inputs: &ScoreInputs) -> f64 {
        let total = self.punctuality + self.reliability + self.confirmation;
        if total <= 0.0 {
            return 0.0;
        }
        let sum = self.punctuality * inputs.punctuality
            + self.reliability * inputs.reliability
            + self.confirmation * inputs.confirmation_ratio;
        (sum / total * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub efficiency: ScoreWeights,
    pub availability: ScoreWeights,
}

impl Default for WeightedScore {
    fn default() -> Self {
        Self { efficiency: ScoreWeights::equal(), availability: ScoreWeights::equal() }
    }
}

impl ScoreFormula for WeightedScore {
    fn efficiency(&self, inputs: &ScoreInputs) -> f64 {
        self.efficiency.apply(inputs)
    }

    fn availability(&self, inputs: &ScoreInputs) -> f64 {
        self.availability.apply(inputs)
    }
}

pub struct MetricsAggregator<'a> {
    pub overtime_threshold_hours: f64,
    pub formula: &'a dyn ScoreFormula,
}

impl MetricsAggregator<'_> {
    /// Metrics for `staff_id` over shifts starting in `period_start..=period_end`.
    /// Shifts of other staff in `shifts` are ignored.
    ///
    /// # Panics
    ///
    /// Panics when the period is reversed.
    pub fn compute_for_staff<'s, I>(
        &self,
        staff_id: i64,
        shifts: I,
        period_start: NaiveDate,
        period_end: NaiveDate,
        contracted_weekly_hours: Option<f64>,
    ) -> StaffMetrics
    where
        I: IntoIterator<Item = &'s ShiftBlock>,
    {
        assert!(period_start <= period_end, "metrics period {period_start}..{period_end} is reversed");

        let mut counts = ShiftCounts::default();
        let mut minutes: u64 = 0;
        for s in shifts {
            if s.staff_id != staff_id || s.date < period_start || s.date > period_end {
                continue;
            }
            match s.status {
                ShiftStatus::Pending => counts.pending += 1,
                ShiftStatus::Confirmed => counts.confirmed += 1,
                ShiftStatus::Cancelled => counts.cancelled += 1,
                ShiftStatus::NoShow => counts.no_show += 1,
            }
            if s.status.is_active() {
                minutes += duration_minutes(s.start_time, s.end_time) as u64;
            }
        }

        let total_hours = minutes as f64 / 60.0;
        let inputs = ScoreInputs::from_counts(&counts);
        StaffMetrics {
            staff_id,
            period_start,
            period_end,
            total_hours,
            overtime_hours: (total_hours - self.overtime_threshold_hours).max(0.0),
            overtime_threshold_hours: self.overtime_threshold_hours,
            contracted_weekly_hours,
            efficiency_score: self.formula.efficiency(&inputs).clamp(0.0, 100.0),
            availability_score: self.formula.availability(&inputs).clamp(0.0, 100.0),
            shifts: counts,
        }
    }
}
