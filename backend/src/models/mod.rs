// backend/src/models/mod.rs

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

// ───────────────────────────────────────
// Wall-clock time of day ("HH:MM")
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    /// Minutes since midnight, always `< 1440`.
    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }
}

impl FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|e| format!("invalid time '{}': {}", s, e))?;
        Self::from_hm(t.hour(), t.minute()).ok_or_else(|| format!("invalid time '{}'", s))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ───────────────────────────────────────
// Staff directory entries (owned externally)
// ───────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub staff_id: i64,
    pub full_name: String,
    pub department: String,
    pub contracted_weekly_hours: Option<f64>,
}

// ───────────────────────────────────────
// Shifts
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    Day,
    Evening,
    Night,
    Break,
    Meeting,
    Training,
    Overtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShiftStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
}

impl ShiftStatus {
    /// Pending and confirmed shifts hold the staff member's time.
    pub fn is_active(self) -> bool {
        matches!(self, ShiftStatus::Pending | ShiftStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ShiftStatus::Cancelled | ShiftStatus::NoShow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftStatus::Pending => "pending",
            ShiftStatus::Confirmed => "confirmed",
            ShiftStatus::Cancelled => "cancelled",
            ShiftStatus::NoShow => "no-show",
        }
    }
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftBlock {
    pub id: i64,
    pub staff_id: i64,
    pub date: NaiveDate, // day the shift starts on
    pub start_time: ClockTime,
    pub end_time: ClockTime, // <= start_time means the next day
    pub location: String,
    #[serde(rename = "type")]
    pub shift_type: ShiftType,
    pub status: ShiftStatus,
    #[serde(default)]
    pub skills_required: BTreeSet<String>,
    #[serde(default)]
    pub certifications_required: BTreeSet<String>,
}

impl ShiftBlock {
    pub fn is_overnight(&self) -> bool {
        self.end_time <= self.start_time
    }

    /// Capability check only; eligibility never blocks scheduling.
    pub fn is_eligible(&self, skills: &BTreeSet<String>, certifications: &BTreeSet<String>) -> bool {
        self.skills_required.is_subset(skills)
            && self.certifications_required.is_subset(certifications)
    }
}

/// Scheduling request. Times stay raw so malformed input surfaces as a
/// time-range error from the store instead of a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub staff_id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    #[serde(rename = "type")]
    pub shift_type: ShiftType,
    #[serde(default)]
    pub status: Option<ShiftStatus>,
    #[serde(default)]
    pub skills_required: BTreeSet<String>,
    #[serde(default)]
    pub certifications_required: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub shift_type: Option<ShiftType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ShiftStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_required: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications_required: Option<BTreeSet<String>>,
}

impl ShiftPatch {
    pub fn status(status: ShiftStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftQuery {
    pub staff_ids: Option<Vec<i64>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub department: Option<String>,
    pub active_only: bool,
}

// ───────────────────────────────────────
// Coverage
// ───────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingRequirement {
    pub department: String,
    pub required_staff: u32,
    // Window of the day [from, until); whole day when unset.
    #[serde(default)]
    pub from: Option<ClockTime>,
    #[serde(default)]
    pub until: Option<ClockTime>,
}

impl StaffingRequirement {
    /// Whether the requirement window shares any minute with `[start, end)`.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        let from = self.from.map(ClockTime::minutes).unwrap_or(0);
        let until = self.until.map(ClockTime::minutes).unwrap_or(MINUTES_PER_DAY);
        let hits = |a: u32, b: u32| a < end && start < b;
        if from < until {
            hits(from, until)
        } else {
            // window wraps past midnight (or covers the whole day when equal)
            hits(from, MINUTES_PER_DAY) || hits(0, until)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageClass {
    Optimal,
    Good,
    Low,
}

impl CoverageClass {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            CoverageClass::Optimal
        } else if percentage >= 80.0 {
            CoverageClass::Good
        } else {
            CoverageClass::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCell {
    pub date: NaiveDate,
    pub department: String,
    pub bucket_start: ClockTime,
    pub bucket_minutes: u32,
    pub required_staff: u32,
    pub assigned_staff: f64, // pending shifts weigh 0.5
    pub percentage: f64,     // capped at 100
    pub raw_ratio: f64,      // assigned / required, unclamped
    pub classification: CoverageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentCoverage {
    pub department: String,
    pub required_staff: u64,
    pub assigned_staff: f64,
    pub percentage: f64,
    pub raw_ratio: f64,
    pub classification: CoverageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub bucket_minutes: u32,
    pub cells: Vec<CoverageCell>,
    pub departments: Vec<DepartmentCoverage>,
}

// ───────────────────────────────────────
// Metrics
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCounts {
    pub pending: u32,
    pub confirmed: u32,
    pub cancelled: u32,
    pub no_show: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMetrics {
    pub staff_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub overtime_threshold_hours: f64,
    pub contracted_weekly_hours: Option<f64>,
    pub efficiency_score: f64,   // 0..100
    pub availability_score: f64, // 0..100
    pub shifts: ShiftCounts,
}

// ───────────────────────────────────────
// External feed
// ───────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalUpdate {
    pub shift_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>, // reporting system, for logs only
    #[serde(flatten)]
    pub patch: ShiftPatch,
}

// ───────────────────────────────────────
// DTOs helpful for endpoints
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertCount { pub upserted: usize }
