use chrono::NaiveDate;

use super::timeline::{day_start, Span};
use crate::models::{
    ClockTime, CoverageCell, CoverageClass, CoverageReport, DepartmentCoverage, ShiftBlock,
    ShiftStatus, StaffingRequirement, MINUTES_PER_DAY,
};

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Head-count a shift contributes to coverage.
pub fn status_weight(status: ShiftStatus) -> f64 {
    match status {
        ShiftStatus::Confirmed => 1.0,
        ShiftStatus::Pending => 0.5,
        ShiftStatus::Cancelled | ShiftStatus::NoShow => 0.0,
    }
}

/// (reported percentage capped at 100, raw ratio, class from the raw ratio)
fn score(assigned: f64, required: f64) -> (f64, f64, CoverageClass) {
    let raw_ratio = assigned / required;
    let percentage = (raw_ratio * 100.0).min(100.0);
    (percentage, raw_ratio, CoverageClass::from_percentage(raw_ratio * 100.0))
}

/// Coverage of every department named in `requirements`, per day in
/// `from..=to` and per `bucket_minutes` slice of the day.
///
/// Shifts may be passed unfiltered; only those whose midnight-adjusted span
/// touches a bucket count, so a night shift from the day before `from`
/// still covers the early buckets of `from`. Buckets with no requirement
/// are left out of the report.
///
/// # Panics
///
/// Panics when `bucket_minutes` is zero or `from > to`.
pub fn analyze(
    shifts: &[ShiftBlock],
    requirements: &[StaffingRequirement],
    bucket_minutes: u32,
    from: NaiveDate,
    to: NaiveDate,
) -> CoverageReport {
    assert!(bucket_minutes > 0, "coverage bucket size must be positive");
    assert!(from <= to, "coverage range {from}..{to} is reversed");

    let mut departments: Vec<(String, String)> = Vec::new(); // (key, label)
    for r in requirements {
        let key = norm(&r.department);
        if !departments.iter().any(|(k, _)| *k == key) {
            departments.push((key, r.department.clone()));
        }
    }

    let counted: Vec<(String, Span, f64)> = shifts
        .iter()
        .filter(|s| status_weight(s.status) > 0.0)
        .map(|s| (norm(&s.location), Span::of_shift(s), status_weight(s.status)))
        .collect();

    let mut cells = Vec::new();
    let mut summary = Vec::with_capacity(departments.len());

    for (key, label) in &departments {
        let reqs: Vec<&StaffingRequirement> =
            requirements.iter().filter(|r| norm(&r.department) == *key).collect();
        let mut required_total: u64 = 0;
        let mut assigned_total = 0.0;

        for date in from.iter_days().take_while(|d| *d <= to) {
            let base = day_start(date);
            let mut bucket_start = 0;
            while bucket_start < MINUTES_PER_DAY {
                let bucket_end = (bucket_start + bucket_minutes).min(MINUTES_PER_DAY);
                let required = reqs
                    .iter()
                    .filter(|r| r.overlaps(bucket_start, bucket_end))
                    .map(|r| r.required_staff)
                    .max()
                    .unwrap_or(0);

                if required > 0 {
                    let bucket = Span { start: base + bucket_start as i64, end: base + bucket_end as i64 };
                    let assigned: f64 = counted
                        .iter()
                        .filter(|(dept, span, _)| dept == key && span.overlaps(&bucket))
                        .map(|(_, _, weight)| weight)
                        .sum();
                    let (percentage, raw_ratio, classification) = score(assigned, required as f64);

                    required_total += required as u64;
                    assigned_total += assigned;
                    cells.push(CoverageCell {
                        date,
                        department: label.clone(),
                        bucket_start: ClockTime::from_hm(bucket_start / 60, bucket_start % 60)
                            .unwrap_or_else(|| unreachable!("bucket starts stay inside the day")),
                        bucket_minutes: bucket_end - bucket_start,
                        required_staff: required,
                        assigned_staff: assigned,
                        percentage,
                        raw_ratio,
                        classification,
                    });
                }
                bucket_start = bucket_end;
            }
        }

        if required_total > 0 {
            let (percentage, raw_ratio, classification) = score(assigned_total, required_total as f64);
            summary.push(DepartmentCoverage {
                department: label.clone(),
                required_staff: required_total,
                assigned_staff: assigned_total,
                percentage,
                raw_ratio,
                classification,
            });
        }
    }

    CoverageReport { from, to, bucket_minutes, cells, departments: summary }
}
