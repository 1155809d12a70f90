//! Placement loop and restart driver.
//!
//! Each attempt starts from a fresh grid and its own copy of the session
//! list, books fixed reservations, then places sessions greedily by kind
//! priority. The best-scoring attempt across restarts is kept.

use log::{debug, trace};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::DayLayout;
use crate::cost::{Candidate, CostModel};
use crate::grid::{Claim, Grid};
use crate::model::{BatchMask, DayIndex, DivisionId, RoomRef, Session, SlotIndex};
use crate::rooms::RoomAllocator;
use crate::workload::WorkloadPlan;

const BASE_SCORE: i64 = 1_000_000;
const UNPLACED_PENALTY: i64 = 100_000;
const GAP_PENALTY: i64 = 50_000;
/// A slot this cheap ends the scan of its day.
const GOOD_SLOT: i64 = -10_000;
/// A best this cheap ends the scan of the remaining days.
const GOOD_DAY: i64 = -50_000;

/// A pre-booked project slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub division: DivisionId,
    pub day: DayIndex,
    pub slot: SlotIndex,
}

/// Furthest stage a session reached before it was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnplacedReason {
    NoFreeSlot,
    NoRoom,
    RejectedBySoftRules,
}

impl UnplacedReason {
    pub fn label(self) -> &'static str {
        match self {
            UnplacedReason::NoFreeSlot => "no_free_slot",
            UnplacedReason::NoRoom => "no_room",
            UnplacedReason::RejectedBySoftRules => "rejected_by_soft_rules",
        }
    }
}

/// Read-only inputs shared by every attempt.
pub struct SearchContext<'a> {
    pub plan: &'a WorkloadPlan,
    pub layout: &'a DayLayout,
    pub rooms: &'a RoomAllocator,
    pub room_count: usize,
    pub cost: &'a CostModel,
    pub reservations: &'a [Reservation],
}

/// One full pass of the placement loop.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub sessions: Vec<Session>,
    pub grid: Grid,
    pub unplaced: Vec<(usize, UnplacedReason)>,
    pub gaps: usize,
    pub score: i64,
}

impl Attempt {
    pub fn is_perfect(&self) -> bool {
        self.unplaced.is_empty() && self.gaps == 0
    }
}

struct Spot {
    day: DayIndex,
    slot: SlotIndex,
    rooms: Vec<RoomRef>,
    cost: i64,
}

pub fn score(unplaced: usize, gaps: usize) -> i64 {
    BASE_SCORE - UNPLACED_PENALTY * unplaced as i64 - GAP_PENALTY * gaps as i64
}

impl<'a> SearchContext<'a> {
    fn empty_grid(&self) -> Grid {
        Grid::new(
            self.layout.clone(),
            self.plan.divisions.len(),
            self.plan.teachers.iter().map(|t| t.shift).collect(),
            self.room_count,
        )
    }

    fn book_reservations(&self, grid: &mut Grid, sessions: &mut Vec<Session>) {
        for r in self.reservations {
            let claim = Claim::division(r.division, BatchMask::ALL);
            if !grid.is_free(r.day, r.slot, 1, &claim) {
                trace!("project slot {} on day {} for division {} already taken", r.slot, r.day, r.division);
                continue;
            }
            let mut session = Session::project(r.division);
            let index = sessions.len();
            grid.book(index, &mut session, r.day, r.slot, vec![RoomRef::Untracked("Project Lab".to_string())]);
            sessions.push(session);
        }
    }

    /// Cheapest feasible spot for `sessions[index]`, or the furthest stage
    /// any candidate reached.
    fn best_spot<R: Rng>(
        &self,
        grid: &Grid,
        sessions: &[Session],
        index: usize,
        rng: &mut R,
    ) -> Result<Spot, UnplacedReason> {
        let session = &sessions[index];
        let staff = session.staff();
        let claim = Claim::division(session.division, session.batch_mask()).with_teachers(&staff);
        let home_room = self.rooms.home_room(session.division);
        let slots = if session.duration > 1 {
            self.layout.lab_starts(session.has_library())
        } else {
            self.layout.lecture_slots()
        };
        let mut days: Vec<DayIndex> = (0..self.layout.day_count()).collect();
        days.shuffle(rng);

        let mut furthest = UnplacedReason::NoFreeSlot;
        let mut best: Option<Spot> = None;
        for day in days {
            for &slot in &slots {
                if !grid.is_free(day, slot, session.duration, &claim) {
                    continue;
                }
                let Some(rooms) = self.rooms.resolve(grid, rng, session, day, slot) else {
                    furthest = furthest.max(UnplacedReason::NoRoom);
                    continue;
                };
                let candidate = Candidate {
                    session,
                    day,
                    slot,
                    rooms: &rooms,
                    home_room,
                };
                let Some(cost) = self.cost.evaluate(grid, sessions, &candidate) else {
                    furthest = UnplacedReason::RejectedBySoftRules;
                    continue;
                };
                if best.as_ref().is_none_or(|b| cost < b.cost) {
                    best = Some(Spot { day, slot, rooms, cost });
                }
                if cost < GOOD_SLOT {
                    break;
                }
            }
            if best.as_ref().is_some_and(|b| b.cost < GOOD_DAY) {
                break;
            }
        }
        best.ok_or(furthest)
    }

    pub fn run_attempt<R: Rng>(&self, rng: &mut R) -> Attempt {
        let mut grid = self.empty_grid();
        let mut sessions = self.plan.sessions.clone();
        let demand = sessions.len();
        self.book_reservations(&mut grid, &mut sessions);

        let mut order: Vec<usize> = (0..demand).collect();
        order.shuffle(rng);
        // Stable: the shuffle survives within each kind.
        order.sort_by_key(|&i| sessions[i].kind.priority());

        let mut unplaced = Vec::new();
        for index in order {
            match self.best_spot(&grid, &sessions, index, rng) {
                Ok(spot) => grid.book(index, &mut sessions[index], spot.day, spot.slot, spot.rooms),
                Err(reason) => unplaced.push((index, reason)),
            }
        }

        let gaps = grid.calculate_gaps();
        Attempt {
            score: score(unplaced.len(), gaps),
            sessions,
            grid,
            unplaced,
            gaps,
        }
    }

    /// Runs up to `restarts` attempts and keeps the first highest-scoring one.
    /// Stops as soon as an attempt places everything without gaps.
    pub fn search<R: Rng>(&self, restarts: usize, rng: &mut R) -> (Attempt, usize) {
        let mut best = self.run_attempt(rng);
        let mut runs = 1;
        trace!("attempt 1: score {} gaps {} unplaced {}", best.score, best.gaps, best.unplaced.len());
        while runs < restarts && !best.is_perfect() {
            let attempt = self.run_attempt(rng);
            runs += 1;
            trace!(
                "attempt {}: score {} gaps {} unplaced {}",
                runs,
                attempt.score,
                attempt.gaps,
                attempt.unplaced.len()
            );
            if attempt.score > best.score {
                debug!("attempt {} is the new best with score {}", runs, attempt.score);
                best = attempt;
            }
        }
        (best, runs)
    }
}
