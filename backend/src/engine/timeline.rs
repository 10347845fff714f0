//! Time arithmetic shared by the whole engine.
//!
//! A shift whose end time is at or before its start time ends on the next
//! calendar day. That rule lives here and nowhere else: the store uses
//! [`Span`] for overlap checks, coverage uses it for bucket intersection,
//! metrics use [`duration_minutes`] for hour totals and the rota grid uses
//! [`TimelineWindow::layout`] for geometry.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::error::{RotaError, RotaResult};
use crate::models::{ClockTime, ShiftBlock, MINUTES_PER_DAY};

/// True length of a shift in minutes, midnight-adjusted.
pub fn duration_minutes(start: ClockTime, end: ClockTime) -> u32 {
    let raw = end.minutes() as i64 - start.minutes() as i64;
    if raw <= 0 {
        (raw + MINUTES_PER_DAY as i64) as u32
    } else {
        raw as u32
    }
}

/// Absolute minute at which `date` begins.
pub fn day_start(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 * MINUTES_PER_DAY as i64
}

/// Half-open interval of absolute minutes occupied by a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn of(date: NaiveDate, start: ClockTime, end: ClockTime) -> Self {
        let begin = day_start(date) + start.minutes() as i64;
        Self { start: begin, end: begin + duration_minutes(start, end) as i64 }
    }

    pub fn of_shift(shift: &ShiftBlock) -> Self {
        Self::of(shift.date, shift.start_time, shift.end_time)
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn minutes(&self) -> i64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    /// Minutes from the window start to the first visible minute.
    pub offset_minutes: u32,
    /// Rendered length after clipping and the minimum-size floor.
    pub duration_minutes: u32,
    /// Real shift length; hour totals always use this one.
    pub true_duration_minutes: u32,
    pub clipped: bool,
}

/// The visible slice of a rota day. `end_hour <= start_hour` means the
/// window runs into the next day; equal hours give a full 24h window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    start_hour: u32,
    end_hour: u32,
    min_render_minutes: u32,
}

impl TimelineWindow {
    pub fn new(start_hour: u32, end_hour: u32, min_render_minutes: u32) -> RotaResult<Self> {
        if start_hour >= 24 || end_hour > 24 {
            return Err(RotaError::InvalidTimeRange(format!(
                "timeline window {start_hour}..{end_hour} is outside 0..24"
            )));
        }
        Ok(Self { start_hour, end_hour, min_render_minutes })
    }

    /// Same minimum render size, different visible hours.
    pub fn with_hours(&self, start_hour: u32, end_hour: u32) -> RotaResult<Self> {
        Self::new(start_hour, end_hour, self.min_render_minutes)
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    fn bounds(&self) -> (u32, u32) {
        let start = self.start_hour * 60;
        let mut end = self.end_hour * 60;
        if end <= start {
            end += MINUTES_PER_DAY;
        }
        (start, end)
    }

    pub fn len_minutes(&self) -> u32 {
        let (start, end) = self.bounds();
        end - start
    }

    /// Geometry of a shift inside this window, or `None` when no part of it
    /// is visible on its own start date.
    pub fn layout(&self, start: ClockTime, end: ClockTime) -> Option<Layout> {
        let (window_start, window_end) = self.bounds();
        let true_duration = duration_minutes(start, end);
        let shift_start = start.minutes();
        let shift_end = shift_start + true_duration;

        let visible_start = shift_start.max(window_start);
        let visible_end = shift_end.min(window_end);
        if visible_end <= visible_start {
            return None;
        }

        let offset = visible_start - window_start;
        let visible = visible_end - visible_start;
        let rendered = visible.max(self.min_render_minutes).min(window_end - visible_start);

        Some(Layout {
            offset_minutes: offset,
            duration_minutes: rendered,
            true_duration_minutes: true_duration,
            clipped: visible < true_duration,
        })
    }
}

pub fn layout(shift: &ShiftBlock, window: &TimelineWindow) -> Option<Layout> {
    window.layout(shift.start_time, shift.end_time)
}
