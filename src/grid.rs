//! Availability index: who and what is busy in every (day, slot).
//!
//! Occupancy lives in flat arrays sized once from the day layout and the
//! number of divisions, teachers and rooms, so every lookup is an index
//! computation. `book` is the only mutator; there is no un-booking.

use std::collections::HashMap;

use crate::config::DayLayout;
use crate::model::{
    BatchMask, DayIndex, DivisionId, Placement, RoomId, RoomRef, Session, SessionKind, Shift,
    SlotIndex, TeacherId,
};

/// Everything a candidate placement wants to occupy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Claim<'a> {
    pub division: Option<(DivisionId, BatchMask)>,
    pub teachers: &'a [TeacherId],
    pub rooms: &'a [RoomId],
}

impl<'a> Claim<'a> {
    pub fn division(division: DivisionId, batches: BatchMask) -> Self {
        Self {
            division: Some((division, batches)),
            ..Self::default()
        }
    }

    pub fn rooms(rooms: &'a [RoomId]) -> Self {
        Self {
            rooms,
            ..Self::default()
        }
    }

    pub fn with_teachers(mut self, teachers: &'a [TeacherId]) -> Self {
        self.teachers = teachers;
        self
    }

    pub fn with_rooms(mut self, rooms: &'a [RoomId]) -> Self {
        self.rooms = rooms;
        self
    }
}

/// What a division is doing in one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub session: usize,
    pub kind: SessionKind,
    pub room: Option<RoomRef>,
}

#[derive(Debug, Clone)]
pub struct Grid {
    layout: DayLayout,
    shifts: Vec<Shift>,
    divisions: usize,
    rooms: usize,
    // [day][slot][division]
    division_busy: Vec<BatchMask>,
    // [day][slot][teacher]
    teacher_busy: Vec<bool>,
    // [day][slot][room]
    room_busy: Vec<bool>,
    // [day][division][slot]
    cells: Vec<Option<Cell>>,
    // [day][division], sorted and distinct
    division_slots: Vec<Vec<SlotIndex>>,
    subject_days: HashMap<(DivisionId, DayIndex, String), BatchMask>,
}

impl Grid {
    /// Empty grid; `shifts` holds one entry per roster teacher.
    pub fn new(layout: DayLayout, divisions: usize, shifts: Vec<Shift>, rooms: usize) -> Self {
        let days = layout.day_count();
        let slots = layout.slots_per_day;
        Self {
            division_busy: vec![BatchMask::NONE; days * slots * divisions],
            teacher_busy: vec![false; days * slots * shifts.len()],
            room_busy: vec![false; days * slots * rooms],
            cells: vec![None; days * divisions * slots],
            division_slots: vec![Vec::new(); days * divisions],
            subject_days: HashMap::new(),
            layout,
            shifts,
            divisions,
            rooms,
        }
    }

    pub fn layout(&self) -> &DayLayout {
        &self.layout
    }

    fn time_index(&self, day: DayIndex, slot: SlotIndex) -> usize {
        day * self.layout.slots_per_day + slot
    }

    fn division_day(&self, division: DivisionId, day: DayIndex) -> usize {
        day * self.divisions + division
    }

    fn cell_index(&self, day: DayIndex, division: DivisionId, slot: SlotIndex) -> usize {
        self.division_day(division, day) * self.layout.slots_per_day + slot
    }

    /// Hard feasibility of `claim` over every slot of `[start, start + duration)`.
    pub fn is_free(&self, day: DayIndex, start: SlotIndex, duration: usize, claim: &Claim<'_>) -> bool {
        if day >= self.layout.day_count() {
            return false;
        }
        // One teacher cannot stand in two rooms of the same block.
        for (i, t) in claim.teachers.iter().enumerate() {
            if claim.teachers[..i].contains(t) || *t >= self.shifts.len() {
                return false;
            }
        }
        for slot in start..start + duration {
            if !self.layout.is_teaching_slot(slot) {
                return false;
            }
            let at = self.time_index(day, slot);
            if let Some((division, batches)) = claim.division {
                if self.division_busy[at * self.divisions + division].intersects(batches) {
                    return false;
                }
            }
            for &t in claim.teachers {
                if self.teacher_busy[at * self.shifts.len() + t] {
                    return false;
                }
                if !self.shifts[t].is_available(slot, self.layout.slots_per_day) {
                    return false;
                }
            }
            for &r in claim.rooms {
                if r >= self.rooms || self.room_busy[at * self.rooms + r] {
                    return false;
                }
            }
        }
        true
    }

    /// Records `session` (stored at `index` in the attempt) at (day, start).
    pub fn book(&mut self, index: usize, session: &mut Session, day: DayIndex, start: SlotIndex, rooms: Vec<RoomRef>) {
        debug_assert!(!session.is_placed(), "sessions are booked at most once");
        let batches = session.batch_mask();
        let staff = session.staff();
        let teachers = self.shifts.len();

        for slot in start..start + session.duration {
            let at = self.time_index(day, slot);
            let busy = &mut self.division_busy[at * self.divisions + session.division];
            *busy = busy.union(batches);
            for &t in &staff {
                self.teacher_busy[at * teachers + t] = true;
            }
            for r in rooms.iter().filter_map(RoomRef::tracked) {
                self.room_busy[at * self.rooms + r] = true;
            }

            let cell = self.cell_index(day, session.division, slot);
            if self.cells[cell].is_none() {
                self.cells[cell] = Some(Cell {
                    session: index,
                    kind: session.kind,
                    room: rooms.first().cloned(),
                });
            }
            let dd = self.division_day(session.division, day);
            let occupied = &mut self.division_slots[dd];
            if let Err(pos) = occupied.binary_search(&slot) {
                occupied.insert(pos, slot);
            }
        }

        let seen = self
            .subject_days
            .entry((session.division, day, session.subject.clone()))
            .or_default();
        *seen = seen.union(batches);

        session.placement = Some(Placement {
            day,
            slot: start,
            rooms,
        });
    }

    pub fn cell(&self, day: DayIndex, division: DivisionId, slot: SlotIndex) -> Option<&Cell> {
        if slot >= self.layout.slots_per_day {
            return None;
        }
        self.cells[self.cell_index(day, division, slot)].as_ref()
    }

    /// Occupied slots of a division on a day, ascending.
    pub fn occupied_slots(&self, division: DivisionId, day: DayIndex) -> &[SlotIndex] {
        &self.division_slots[self.division_day(division, day)]
    }

    /// Whether `subject` already runs for any of `batches` of the division that day.
    pub fn subject_on_day(&self, division: DivisionId, day: DayIndex, subject: &str, batches: BatchMask) -> bool {
        self.subject_days
            .get(&(division, day, subject.to_string()))
            .is_some_and(|seen| seen.intersects(batches))
    }

    /// Gaps the division's day would have with `extra` slots added.
    pub fn gaps_with(&self, division: DivisionId, day: DayIndex, extra: impl IntoIterator<Item = SlotIndex>) -> usize {
        let mut slots = self.occupied_slots(division, day).to_vec();
        slots.extend(extra);
        count_gaps(&slots, self.layout.recess)
    }

    /// Total internal holes over every division and day.
    pub fn calculate_gaps(&self) -> usize {
        self.division_slots
            .iter()
            .map(|slots| count_gaps(slots, self.layout.recess))
            .sum()
    }
}

/// Empty slots strictly between the first and last occupied slot, not
/// counting recess.
pub fn count_gaps(slots: &[SlotIndex], recess: SlotIndex) -> usize {
    let mut valid: Vec<SlotIndex> = slots.iter().copied().filter(|&s| s != recess).collect();
    valid.sort_unstable();
    valid.dedup();
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        return 0;
    };
    let mut span = last - first + 1;
    if first < recess && recess < last {
        span -= 1;
    }
    span - valid.len()
}
