//! Soft-constraint cost of a hard-feasible candidate placement.
//!
//! Lower is better. Most terms are additive penalties or bonuses; a repeated
//! subject on the same day rejects the candidate outright.

use crate::data::DayPart;
use crate::grid::Grid;
use crate::model::{DayIndex, RoomId, RoomRef, Session, SessionKind, SlotIndex};

/// Points for each soft rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWeights {
    pub elective_off_edge: i64,
    pub teacher_adjacent_bonus: i64,
    pub gap: i64,
    pub after_recess_bonus: i64,
    pub first_slot_bonus: i64,
    pub lecture_pair: i64,
    pub lecture_run: i64,
    pub away_from_home_morning: i64,
    pub away_from_home_afternoon: i64,
    pub room_switch: i64,
    pub room_stay_bonus: i64,
    pub lab_off_bias: i64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            elective_off_edge: 5_000,
            teacher_adjacent_bonus: 1_000,
            gap: 50_000,
            after_recess_bonus: 100_000,
            first_slot_bonus: 20_000,
            lecture_pair: 5_000,
            lecture_run: 10_000,
            away_from_home_morning: 5_000,
            away_from_home_afternoon: 500,
            room_switch: 2_000,
            room_stay_bonus: 500,
            lab_off_bias: 2_000,
        }
    }
}

/// A hard-feasible placement waiting to be scored.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub session: &'a Session,
    pub day: DayIndex,
    pub slot: SlotIndex,
    pub rooms: &'a [RoomRef],
    pub home_room: Option<RoomId>,
}

#[derive(Debug, Clone)]
pub struct CostModel {
    pub weights: CostWeights,
    /// Preferred half of the day for labs, per division.
    lab_bias: Vec<DayPart>,
}

impl CostModel {
    pub fn new(lab_bias: Vec<DayPart>) -> Self {
        Self {
            weights: CostWeights::default(),
            lab_bias,
        }
    }

    /// Total cost, or `None` when a rule rejects the candidate.
    pub fn evaluate(&self, grid: &Grid, sessions: &[Session], c: &Candidate<'_>) -> Option<i64> {
        if self.repeats_subject(grid, c) {
            return None;
        }
        let cost = self.elective_edges(grid, c)
            + self.teacher_compactness(grid, sessions, c)
            + self.gaps(grid, c)
            + self.anchors(grid, c)
            + self.lecture_fatigue(grid, c)
            + self.room_stickiness(grid, c)
            + self.lab_bias(grid, c);
        Some(cost)
    }

    fn repeats_subject(&self, grid: &Grid, c: &Candidate<'_>) -> bool {
        let s = c.session;
        match s.kind {
            SessionKind::Theory | SessionKind::Elective | SessionKind::Tutorial => {
                grid.subject_on_day(s.division, c.day, &s.subject, s.batch_mask())
            }
            SessionKind::Lab | SessionKind::Project => false,
        }
    }

    fn elective_edges(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        if c.session.kind != SessionKind::Elective {
            return 0;
        }
        let last = grid.layout().last_slot();
        let at_edge = c.slot == 0 || c.slot == last || c.slot + 1 == last;
        if at_edge { 0 } else { self.weights.elective_off_edge }
    }

    fn teacher_compactness(&self, grid: &Grid, sessions: &[Session], c: &Candidate<'_>) -> i64 {
        let staff = c.session.staff();
        if staff.is_empty() {
            return 0;
        }
        let layout = grid.layout();
        let end = c.slot + c.session.duration - 1;
        [layout.prev_teaching(c.slot), layout.next_teaching(end)]
            .into_iter()
            .flatten()
            .filter_map(|n| grid.cell(c.day, c.session.division, n))
            .filter(|cell| {
                sessions
                    .get(cell.session)
                    .is_some_and(|other| other.staff().iter().any(|t| staff.contains(t)))
            })
            .map(|_| -self.weights.teacher_adjacent_bonus)
            .sum()
    }

    fn gaps(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        let added = c.slot..c.slot + c.session.duration;
        grid.gaps_with(c.session.division, c.day, added) as i64 * self.weights.gap
    }

    fn anchors(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        let mut cost = 0;
        if c.slot == grid.layout().recess + 1 {
            cost -= self.weights.after_recess_bonus;
        }
        if c.slot == 0 {
            cost -= self.weights.first_slot_bonus;
        }
        cost
    }

    /// Length of the run of lectures the candidate would join.
    fn lecture_run(&self, grid: &Grid, c: &Candidate<'_>) -> usize {
        let layout = grid.layout();
        let is_lecture = |slot: SlotIndex| {
            grid.cell(c.day, c.session.division, slot)
                .is_some_and(|cell| cell.kind.is_lecture())
        };
        let mut run = 0;
        let mut cursor = layout.prev_teaching(c.slot);
        while let Some(slot) = cursor.filter(|&s| is_lecture(s)) {
            run += 1;
            cursor = layout.prev_teaching(slot);
        }
        let mut cursor = layout.next_teaching(c.slot + c.session.duration - 1);
        while let Some(slot) = cursor.filter(|&s| is_lecture(s)) {
            run += 1;
            cursor = layout.next_teaching(slot);
        }
        run
    }

    fn lecture_fatigue(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        if !c.session.kind.is_lecture() {
            return 0;
        }
        let run = self.lecture_run(grid, c);
        let mut cost = 0;
        if run >= 2 {
            cost += self.weights.lecture_pair;
        }
        if run >= 3 {
            cost += self.weights.lecture_run;
        }
        cost
    }

    fn room_stickiness(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        if !c.session.kind.is_lecture() {
            return 0;
        }
        let (Some(proposed), Some(home)) = (c.rooms.first(), c.home_room) else {
            return 0;
        };
        let layout = grid.layout();
        let mut cost = 0;
        if proposed.tracked() != Some(home) {
            cost += if layout.is_before_recess(c.slot) {
                self.weights.away_from_home_morning
            } else {
                self.weights.away_from_home_afternoon
            };
        }
        let previous_room = layout
            .prev_teaching(c.slot)
            .and_then(|p| grid.cell(c.day, c.session.division, p))
            .and_then(|cell| cell.room.as_ref());
        if let Some(previous) = previous_room {
            if previous == proposed {
                cost -= self.weights.room_stay_bonus;
            } else {
                cost += self.weights.room_switch;
            }
        }
        cost
    }

    fn lab_bias(&self, grid: &Grid, c: &Candidate<'_>) -> i64 {
        if c.session.kind != SessionKind::Lab {
            return 0;
        }
        let bias = self
            .lab_bias
            .get(c.session.division)
            .copied()
            .unwrap_or_default();
        let morning = grid.layout().is_before_recess(c.slot);
        match (bias, morning) {
            (DayPart::Afternoon, true) | (DayPart::Morning, false) => self.weights.lab_off_bias,
            _ => 0,
        }
    }
}
