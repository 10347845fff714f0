//! Canonical shift records for one rota.
//!
//! `ShiftStore` itself is plain data; [`super::Rota`] owns it behind the
//! readers-writer lock. Every mutation validates the full candidate record
//! before touching state, so a rejected call leaves the store unchanged.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};

use super::error::{RotaError, RotaResult};
use super::lifecycle;
use super::timeline::Span;
use crate::models::{ClockTime, NewShift, ShiftBlock, ShiftPatch, ShiftQuery, ShiftStatus, StaffMember};

// ─────────────────────────────────────────────────────────────────────────────
// Staff directory
// ─────────────────────────────────────────────────────────────────────────────

/// Read access to the external staff directory.
pub trait StaffDirectory: Send + Sync {
    fn get(&self, staff_id: i64) -> Option<StaffMember>;

    fn contains(&self, staff_id: i64) -> bool {
        self.get(staff_id).is_some()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStaffDirectory {
    members: RwLock<HashMap<i64, StaffMember>>,
}

impl InMemoryStaffDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, member: StaffMember) {
        self.upsert_many([member]);
    }

    pub fn upsert_many<I: IntoIterator<Item = StaffMember>>(&self, members: I) -> usize {
        let mut guard = self.members.write().unwrap_or_else(PoisonError::into_inner);
        let mut n = 0;
        for m in members {
            guard.insert(m.staff_id, m);
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.members.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StaffDirectory for InMemoryStaffDirectory {
    fn get(&self, staff_id: i64) -> Option<StaffMember> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&staff_id)
            .cloned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

fn parse_time(field: &str, raw: &str) -> RotaResult<ClockTime> {
    raw.parse()
        .map_err(|e: String| RotaError::InvalidTimeRange(format!("{field}: {e}")))
}

fn check_range(start: ClockTime, end: ClockTime) -> RotaResult<()> {
    if start == end {
        return Err(RotaError::InvalidTimeRange(format!(
            "start and end are both {start}"
        )));
    }
    Ok(())
}

fn time_ordered(a: &ShiftBlock, b: &ShiftBlock) -> std::cmp::Ordering {
    (a.date, a.start_time, a.id).cmp(&(b.date, b.start_time, b.id))
}

/// Everything except the status, which the lifecycle governs separately.
fn same_fields(a: &ShiftBlock, b: &ShiftBlock) -> bool {
    a.staff_id == b.staff_id
        && a.date == b.date
        && a.start_time == b.start_time
        && a.end_time == b.end_time
        && a.location == b.location
        && a.shift_type == b.shift_type
        && a.skills_required == b.skills_required
        && a.certifications_required == b.certifications_required
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ShiftStore {
    shifts: BTreeMap<i64, ShiftBlock>,
    by_staff: HashMap<i64, BTreeSet<i64>>,
    last_id: i64,
    revision: u64,
}

impl ShiftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped once per committed mutation; no-op updates leave it alone.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&ShiftBlock> {
        self.shifts.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShiftBlock> {
        self.shifts.values()
    }

    pub fn shifts_for_staff(&self, staff_id: i64) -> impl Iterator<Item = &ShiftBlock> {
        self.by_staff
            .get(&staff_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.shifts.get(id))
    }

    /// First active shift of the same staff member whose span intersects
    /// `candidate`, ignoring `candidate` itself.
    pub fn find_overlap(&self, candidate: &ShiftBlock) -> Option<i64> {
        let span = Span::of_shift(candidate);
        self.shifts_for_staff(candidate.staff_id)
            .filter(|s| s.id != candidate.id && s.status.is_active())
            .find(|s| Span::of_shift(s).overlaps(&span))
            .map(|s| s.id)
    }

    fn validate(&self, candidate: &ShiftBlock) -> RotaResult<()> {
        check_range(candidate.start_time, candidate.end_time)?;
        if candidate.status.is_active() {
            if let Some(conflicting_shift_id) = self.find_overlap(candidate) {
                return Err(RotaError::Overlap {
                    staff_id: candidate.staff_id,
                    conflicting_shift_id,
                });
            }
        }
        Ok(())
    }

    pub fn create(&mut self, new: NewShift, directory: &dyn StaffDirectory) -> RotaResult<ShiftBlock> {
        let start_time = parse_time("start_time", &new.start_time)?;
        let end_time = parse_time("end_time", &new.end_time)?;
        check_range(start_time, end_time)?;
        let status = lifecycle::initial_status(new.status)?;
        if !directory.contains(new.staff_id) {
            return Err(RotaError::UnknownStaff(new.staff_id));
        }

        let candidate = ShiftBlock {
            id: self.last_id + 1,
            staff_id: new.staff_id,
            date: new.date,
            start_time,
            end_time,
            location: new.location,
            shift_type: new.shift_type,
            status,
            skills_required: new.skills_required,
            certifications_required: new.certifications_required,
        };
        self.validate(&candidate)?;

        self.last_id = candidate.id;
        self.insert(candidate.clone());
        Ok(candidate)
    }

    /// Applies `patch` to shift `id`. Returns the resulting record and
    /// whether anything actually changed.
    pub fn update(
        &mut self,
        id: i64,
        patch: &ShiftPatch,
        directory: &dyn StaffDirectory,
    ) -> RotaResult<(ShiftBlock, bool)> {
        let current = self.shifts.get(&id).ok_or(RotaError::UnknownShift(id))?;

        let mut candidate = current.clone();
        if let Some(staff_id) = patch.staff_id {
            candidate.staff_id = staff_id;
        }
        if let Some(date) = patch.date {
            candidate.date = date;
        }
        if let Some(raw) = &patch.start_time {
            candidate.start_time = parse_time("start_time", raw)?;
        }
        if let Some(raw) = &patch.end_time {
            candidate.end_time = parse_time("end_time", raw)?;
        }
        if let Some(location) = &patch.location {
            candidate.location = location.clone();
        }
        if let Some(shift_type) = patch.shift_type {
            candidate.shift_type = shift_type;
        }
        if let Some(skills) = &patch.skills_required {
            candidate.skills_required = skills.clone();
        }
        if let Some(certs) = &patch.certifications_required {
            candidate.certifications_required = certs.clone();
        }
        if let Some(status) = patch.status {
            lifecycle::check_transition(current.status, status)?;
            candidate.status = status;
        }

        let fields_changed = !same_fields(current, &candidate);
        if fields_changed && current.status.is_terminal() {
            return Err(RotaError::ShiftClosed { shift_id: id, status: current.status });
        }
        if candidate.staff_id != current.staff_id && !directory.contains(candidate.staff_id) {
            return Err(RotaError::UnknownStaff(candidate.staff_id));
        }
        if candidate == *current {
            return Ok((candidate, false));
        }
        self.validate(&candidate)?;

        let previous_staff = current.staff_id;
        if previous_staff != candidate.staff_id {
            if let Some(ids) = self.by_staff.get_mut(&previous_staff) {
                ids.remove(&id);
            }
        }
        self.insert(candidate.clone());
        Ok((candidate, true))
    }

    /// Soft delete: the record stays, with status `cancelled`.
    pub fn cancel(&mut self, id: i64, directory: &dyn StaffDirectory) -> RotaResult<ShiftBlock> {
        self.update(id, &ShiftPatch::status(ShiftStatus::Cancelled), directory)
            .map(|(shift, _)| shift)
    }

    fn insert(&mut self, shift: ShiftBlock) {
        self.by_staff.entry(shift.staff_id).or_default().insert(shift.id);
        self.shifts.insert(shift.id, shift);
        self.revision += 1;
    }

    /// Time-ordered snapshot matching every filter set on `q`.
    pub fn query(&self, q: &ShiftQuery) -> Vec<ShiftBlock> {
        let department = q.department.as_deref().map(norm);
        let mut rows: Vec<ShiftBlock> = self
            .shifts
            .values()
            .filter(|s| q.staff_ids.as_ref().map_or(true, |ids| ids.contains(&s.staff_id)))
            .filter(|s| q.from.map_or(true, |from| s.date >= from))
            .filter(|s| q.to.map_or(true, |to| s.date <= to))
            .filter(|s| department.as_ref().map_or(true, |d| norm(&s.location) == *d))
            .filter(|s| !q.active_only || s.status.is_active())
            .cloned()
            .collect();
        rows.sort_by(time_ordered);
        rows
    }

    /// SHA-256 of the canonical JSON of every record, in id order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for shift in self.shifts.values() {
            // ShiftBlock only holds plain data, serialization cannot fail
            if let Ok(bytes) = serde_json::to_vec(shift) {
                hasher.update(&bytes);
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ShiftType;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    pub(crate) fn directory(ids: &[i64]) -> InMemoryStaffDirectory {
        let dir = InMemoryStaffDirectory::new();
        dir.upsert_many(ids.iter().map(|&id| StaffMember {
            staff_id: id,
            full_name: format!("Staff {id}"),
            department: "ward-a".into(),
            contracted_weekly_hours: Some(37.5),
        }));
        dir
    }

    pub(crate) fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    pub(crate) fn new_shift(staff_id: i64, date: NaiveDate, start: &str, end: &str) -> NewShift {
        NewShift {
            staff_id,
            date,
            start_time: start.into(),
            end_time: end.into(),
            location: "ward-a".into(),
            shift_type: ShiftType::Day,
            status: None,
            skills_required: Default::default(),
            certifications_required: Default::default(),
        }
    }

    #[test]
    fn create_defaults_to_pending_and_assigns_ids() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let a = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let b = store.create(new_shift(1, day(4), "07:00", "15:00"), &dir).unwrap();
        assert_eq!(a.status, ShiftStatus::Pending);
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn rejects_bad_time_ranges() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let err = store.create(new_shift(1, day(3), "09:00", "09:00"), &dir).unwrap_err();
        assert_eq!(err.kind(), "invalid_time_range");
        let err = store.create(new_shift(1, day(3), "9am", "17:00"), &dir).unwrap_err();
        assert_eq!(err.kind(), "invalid_time_range");
        let err = store.create(new_shift(1, day(3), "09:00", "24:30"), &dir).unwrap_err();
        assert_eq!(err.kind(), "invalid_time_range");
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_unknown_staff() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let err = store.create(new_shift(9, day(3), "07:00", "15:00"), &dir).unwrap_err();
        assert_eq!(err, RotaError::UnknownStaff(9));
    }

    #[test]
    fn overlap_names_the_conflicting_shift() {
        let dir = directory(&[1, 2]);
        let mut store = ShiftStore::new();
        let first = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();

        let err = store.create(new_shift(1, day(3), "14:00", "18:00"), &dir).unwrap_err();
        assert_eq!(err, RotaError::Overlap { staff_id: 1, conflicting_shift_id: first.id });

        // touching edges and other staff are fine
        store.create(new_shift(1, day(3), "15:00", "23:00"), &dir).unwrap();
        store.create(new_shift(2, day(3), "07:00", "15:00"), &dir).unwrap();
    }

    #[test]
    fn overnight_shift_blocks_next_morning() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let night = store.create(new_shift(1, day(3), "23:00", "07:00"), &dir).unwrap();

        let err = store.create(new_shift(1, day(4), "06:00", "12:00"), &dir).unwrap_err();
        assert_eq!(err.conflicting_shift_id(), Some(night.id));
        store.create(new_shift(1, day(4), "07:00", "12:00"), &dir).unwrap();
    }

    #[test]
    fn cancelled_shifts_free_the_slot() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let first = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let cancelled = store.cancel(first.id, &dir).unwrap();
        assert_eq!(cancelled.status, ShiftStatus::Cancelled);

        store.create(new_shift(1, day(3), "08:00", "12:00"), &dir).unwrap();
        // soft delete keeps the record
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(first.id).unwrap().status, ShiftStatus::Cancelled);
    }

    #[test]
    fn update_conflict_leaves_store_untouched() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let late = store.create(new_shift(1, day(3), "16:00", "20:00"), &dir).unwrap();
        let before = store.fingerprint();
        let revision = store.revision();

        let patch = ShiftPatch {
            start_time: Some("14:00".into()),
            location: Some("ward-b".into()),
            ..Default::default()
        };
        let err = store.update(late.id, &patch, &dir).unwrap_err();
        assert_eq!(err.conflicting_shift_id(), Some(1));
        assert_eq!(store.fingerprint(), before);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn update_excludes_itself_from_overlap() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let s = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let patch = ShiftPatch { end_time: Some("16:00".into()), ..Default::default() };
        let (updated, changed) = store.update(s.id, &patch, &dir).unwrap();
        assert!(changed);
        assert_eq!(updated.end_time.to_string(), "16:00");
    }

    #[test]
    fn reassigning_staff_moves_the_index() {
        let dir = directory(&[1, 2]);
        let mut store = ShiftStore::new();
        let s = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let patch = ShiftPatch { staff_id: Some(2), ..Default::default() };
        store.update(s.id, &patch, &dir).unwrap();

        assert_eq!(store.shifts_for_staff(1).count(), 0);
        assert_eq!(store.shifts_for_staff(2).count(), 1);
        let patch = ShiftPatch { staff_id: Some(7), ..Default::default() };
        assert_eq!(store.update(s.id, &patch, &dir).unwrap_err(), RotaError::UnknownStaff(7));
    }

    #[test]
    fn lifecycle_is_enforced_on_update() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let s = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let err = store.update(s.id, &ShiftPatch::status(ShiftStatus::NoShow), &dir).unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");

        store.update(s.id, &ShiftPatch::status(ShiftStatus::Confirmed), &dir).unwrap();
        store.update(s.id, &ShiftPatch::status(ShiftStatus::NoShow), &dir).unwrap();

        let edit = ShiftPatch { location: Some("ward-b".into()), ..Default::default() };
        assert_eq!(
            store.update(s.id, &edit, &dir).unwrap_err(),
            RotaError::ShiftClosed { shift_id: s.id, status: ShiftStatus::NoShow }
        );
    }

    #[test]
    fn repeated_update_is_a_no_op() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        let s = store.create(new_shift(1, day(3), "07:00", "15:00"), &dir).unwrap();
        let patch = ShiftPatch::status(ShiftStatus::Confirmed);
        let (_, first) = store.update(s.id, &patch, &dir).unwrap();
        let revision = store.revision();
        let (_, second) = store.update(s.id, &patch, &dir).unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn unknown_shift() {
        let dir = directory(&[1]);
        let mut store = ShiftStore::new();
        assert_eq!(store.cancel(42, &dir).unwrap_err(), RotaError::UnknownShift(42));
    }

    #[test]
    fn query_filters_and_orders() {
        let dir = directory(&[1, 2]);
        let mut store = ShiftStore::new();
        store.create(new_shift(1, day(4), "07:00", "15:00"), &dir).unwrap();
        store.create(new_shift(2, day(3), "15:00", "23:00"), &dir).unwrap();
        let mut icu = new_shift(1, day(3), "07:00", "15:00");
        icu.location = "ICU".into();
        let icu = store.create(icu, &dir).unwrap();
        store.cancel(icu.id, &dir).unwrap();

        let all = store.query(&ShiftQuery::default());
        let order: Vec<i64> = all.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![3, 2, 1]);

        let q = ShiftQuery { department: Some(" icu ".into()), ..Default::default() };
        assert_eq!(store.query(&q).len(), 1);

        let q = ShiftQuery { active_only: true, staff_ids: Some(vec![1]), ..Default::default() };
        assert_eq!(store.query(&q).iter().map(|s| s.id).collect::<Vec<_>>(), vec![1]);

        let q = ShiftQuery { from: Some(day(4)), to: Some(day(4)), ..Default::default() };
        assert_eq!(store.query(&q).len(), 1);
    }

    fn arb_request() -> impl Strategy<Value = (i64, u32, u32, u32, u32)> {
        // staff, day, start hour, start quarter, duration in quarters
        (1i64..=3, 1u32..=4, 0u32..24, 0u32..4, 1u32..=48)
    }

    fn request_to_shift((staff, d, hour, quarter, len): (i64, u32, u32, u32, u32)) -> NewShift {
        let start = hour * 60 + quarter * 15;
        let end = (start + len * 15) % 1440;
        let fmt = |m: u32| format!("{:02}:{:02}", m / 60, m % 60);
        new_shift(staff, day(d), &fmt(start), &fmt(end))
    }

    proptest! {
        #[test]
        fn active_shifts_never_overlap(
            requests in prop::collection::vec(arb_request(), 1..40),
            cancels in prop::collection::vec(0usize..40, 0..10),
        ) {
            let dir = directory(&[1, 2, 3]);
            let mut store = ShiftStore::new();
            for r in requests {
                match store.create(request_to_shift(r), &dir) {
                    Ok(_) => {}
                    Err(RotaError::Overlap { conflicting_shift_id, .. }) => {
                        prop_assert!(store.get(conflicting_shift_id).unwrap().status.is_active());
                    }
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                }
            }
            for c in cancels {
                let _ = store.cancel(c as i64 + 1, &dir);
            }

            let active: Vec<&ShiftBlock> = store.iter().filter(|s| s.status.is_active()).collect();
            for (i, a) in active.iter().enumerate() {
                for b in &active[i + 1..] {
                    if a.staff_id == b.staff_id {
                        prop_assert!(!Span::of_shift(a).overlaps(&Span::of_shift(b)));
                    }
                }
            }
        }

        #[test]
        fn moves_never_introduce_overlap(
            requests in prop::collection::vec(arb_request(), 2..20),
            moves in prop::collection::vec((1i64..20, 0u32..24, 1u32..=4), 1..20),
        ) {
            let dir = directory(&[1, 2, 3]);
            let mut store = ShiftStore::new();
            for r in requests {
                let _ = store.create(request_to_shift(r), &dir);
            }
            for (id, hour, d) in moves {
                let before = store.fingerprint();
                let patch = ShiftPatch {
                    date: Some(day(d)),
                    start_time: Some(format!("{hour:02}:00")),
                    ..Default::default()
                };
                if let Err(e) = store.update(id, &patch, &dir) {
                    prop_assert_eq!(before, store.fingerprint(), "{} left a partial write", e);
                }
            }

            let active: Vec<&ShiftBlock> = store.iter().filter(|s| s.status.is_active()).collect();
            for (i, a) in active.iter().enumerate() {
                for b in &active[i + 1..] {
                    if a.staff_id == b.staff_id {
                        prop_assert!(!Span::of_shift(a).overlaps(&Span::of_shift(b)));
                    }
                }
            }
        }
    }
}
