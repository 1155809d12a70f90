//! Entity model: teachers with their load budgets, and sessions with their
//! placement state.

use serde::Serialize;
use std::collections::HashSet;

use crate::data::{TeacherInput, TeacherLoad};

pub type TeacherId = usize;
pub type DivisionId = usize;
pub type RoomId = usize;
pub type DayIndex = usize;
pub type SlotIndex = usize;

/// Parallel batches per division (lab sections).
pub const BATCH_COUNT: usize = 3;

/// Subjects that stand in for "no teaching": no teacher, no real room.
pub fn is_placeholder_subject(name: &str) -> bool {
    matches!(name, "Library" | "Free")
}

pub fn batch_label(batch: usize) -> String {
    format!("B{}", batch + 1)
}

/// Set of batches of one division, one bit per batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BatchMask(u8);

impl BatchMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self((1 << BATCH_COUNT) - 1);

    pub fn single(batch: usize) -> Self {
        debug_assert!(batch < BATCH_COUNT);
        Self(1 << batch)
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Hod,
    DivIncharge,
    Faculty,
}

impl Role {
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "hod" => Role::Hod,
            "divincharge" => Role::DivIncharge,
            _ => Role::Faculty,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Hod => "HOD",
            Role::DivIncharge => "Div Incharge",
            Role::Faculty => "Faculty",
        }
    }
}

/// Which part of the day a teacher is on campus for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// Leaves before the final slot.
    Morning,
    /// Arrives after the first slot.
    Afternoon,
    Any,
}

impl Shift {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "a" | "morning" => Shift::Morning,
            "b" | "afternoon" => Shift::Afternoon,
            _ => Shift::Any,
        }
    }

    pub fn is_available(self, slot: SlotIndex, slots_per_day: usize) -> bool {
        match self {
            Shift::Morning => slot + 1 < slots_per_day,
            Shift::Afternoon => slot >= 1,
            Shift::Any => true,
        }
    }
}

/// Weekly load budget in slots, derived from role and seniority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCaps {
    pub max_load: u32,
    pub min_target: u32,
    pub max_theory: u32,
    pub max_lab: u32,
}

impl LoadCaps {
    pub fn for_role(role: Role, experience: u32) -> Self {
        let (max_load, min_target, max_theory, max_lab) = match role {
            Role::Hod => (12, 10, 4, 8),
            Role::DivIncharge => (15, 13, 6, 10),
            Role::Faculty if experience >= 10 => (14, 13, 6, 8),
            Role::Faculty => (17, 15, 9, 10),
        };
        Self {
            max_load,
            min_target,
            max_theory,
            max_lab,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Theory,
    Lab,
}

#[derive(Debug, Clone)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub experience: u32,
    pub shift: Shift,
    pub skills: HashSet<String>,
    pub caps: LoadCaps,
    pub current_load: u32,
    pub theory_load: u32,
    pub lab_load: u32,
}

impl Teacher {
    pub fn new(input: &TeacherInput) -> Self {
        let role = Role::from_label(&input.role);
        Self {
            id: input.id.clone(),
            name: input.name.clone(),
            role,
            experience: input.experience,
            shift: Shift::from_label(&input.shift),
            skills: input.skills.iter().cloned().collect(),
            caps: LoadCaps::for_role(role, input.experience),
            current_load: 0,
            theory_load: 0,
            lab_load: 0,
        }
    }

    pub fn has_skill(&self, subject: &str) -> bool {
        self.skills.contains(subject)
    }

    /// Room in the total budget only.
    pub fn fits_total(&self, load: u32) -> bool {
        self.current_load.saturating_add(load) <= self.caps.max_load
    }

    /// Room in both the total budget and the budget of `kind`.
    pub fn can_take_load(&self, load: u32, kind: LoadKind) -> bool {
        if !self.fits_total(load) {
            return false;
        }
        match kind {
            LoadKind::Theory => self.theory_load.saturating_add(load) <= self.caps.max_theory,
            LoadKind::Lab => self.lab_load.saturating_add(load) <= self.caps.max_lab,
        }
    }

    pub fn is_below_target(&self) -> bool {
        self.current_load < self.caps.min_target
    }

    pub fn charge(&mut self, load: u32, kind: LoadKind) {
        self.current_load = self.current_load.saturating_add(load);
        match kind {
            LoadKind::Theory => self.theory_load = self.theory_load.saturating_add(load),
            LoadKind::Lab => self.lab_load = self.lab_load.saturating_add(load),
        }
    }

    pub fn load_report(&self) -> TeacherLoad {
        TeacherLoad {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role.label().to_string(),
            current_load: self.current_load,
            theory_load: self.theory_load,
            lab_load: self.lab_load,
            max_load: self.caps.max_load,
            min_target: self.caps.min_target,
        }
    }
}

/// Who teaches a stream: a roster member, or nobody in particular ("TBA").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeacherRef {
    Staff(TeacherId),
    Vacant,
}

impl TeacherRef {
    pub fn staff(self) -> Option<TeacherId> {
        match self {
            TeacherRef::Staff(id) => Some(id),
            TeacherRef::Vacant => None,
        }
    }
}

/// A room as booked: either one of the interned rooms, whose occupancy is
/// tracked, or a free-form label such as "TBA" that never conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomRef {
    Tracked(RoomId),
    Untracked(String),
}

impl RoomRef {
    pub fn tba() -> Self {
        RoomRef::Untracked("TBA".to_string())
    }

    pub fn tracked(&self) -> Option<RoomId> {
        match self {
            RoomRef::Tracked(id) => Some(*id),
            RoomRef::Untracked(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    Theory,
    Elective,
    Lab,
    Tutorial,
    Project,
}

impl SessionKind {
    pub fn label(self) -> &'static str {
        match self {
            SessionKind::Theory => "THEORY",
            SessionKind::Elective => "ELECTIVE",
            SessionKind::Lab => "LAB",
            SessionKind::Tutorial => "TUTORIAL",
            SessionKind::Project => "PROJECT",
        }
    }

    /// Sit-down lectures, which count towards fatigue.
    pub fn is_lecture(self) -> bool {
        matches!(self, SessionKind::Theory | SessionKind::Elective)
    }

    /// Placement priority: the most constrained kinds go first.
    pub fn priority(self) -> u8 {
        match self {
            SessionKind::Project => 0,
            SessionKind::Lab => 1,
            SessionKind::Elective => 2,
            SessionKind::Tutorial => 3,
            SessionKind::Theory => 4,
        }
    }
}

/// One parallel line of teaching inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub subject: String,
    pub teacher: TeacherRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub day: DayIndex,
    pub slot: SlotIndex,
    pub rooms: Vec<RoomRef>,
}

/// One atomic unit of teaching demand for one division.
#[derive(Debug, Clone)]
pub struct Session {
    pub division: DivisionId,
    pub kind: SessionKind,
    pub subject: String,
    pub duration: usize,
    pub streams: Vec<Stream>,
    /// Set for sessions that occupy a single batch (tutorials).
    pub batch: Option<usize>,
    pub placement: Option<Placement>,
}

impl Session {
    pub fn theory(division: DivisionId, subject: &str, teacher: TeacherRef) -> Self {
        Self {
            division,
            kind: SessionKind::Theory,
            subject: subject.to_string(),
            duration: 1,
            streams: vec![Stream {
                subject: subject.to_string(),
                teacher,
            }],
            batch: None,
            placement: None,
        }
    }

    pub fn elective_block(division: DivisionId, streams: Vec<Stream>) -> Self {
        Self {
            division,
            kind: SessionKind::Elective,
            subject: "Elective Block".to_string(),
            duration: 1,
            streams,
            batch: None,
            placement: None,
        }
    }

    pub fn lab_block(division: DivisionId, streams: Vec<Stream>) -> Self {
        Self {
            division,
            kind: SessionKind::Lab,
            subject: "Lab Session".to_string(),
            duration: 2,
            streams,
            batch: None,
            placement: None,
        }
    }

    pub fn tutorial(division: DivisionId, subject: &str, teacher: TeacherRef, batch: usize) -> Self {
        Self {
            division,
            kind: SessionKind::Tutorial,
            subject: subject.to_string(),
            duration: 1,
            streams: vec![Stream {
                subject: subject.to_string(),
                teacher,
            }],
            batch: Some(batch),
            placement: None,
        }
    }

    pub fn project(division: DivisionId) -> Self {
        Self {
            division,
            kind: SessionKind::Project,
            subject: "Major Project".to_string(),
            duration: 1,
            streams: vec![Stream {
                subject: "Major Project".to_string(),
                teacher: TeacherRef::Vacant,
            }],
            batch: None,
            placement: None,
        }
    }

    pub fn batch_mask(&self) -> BatchMask {
        match self.batch {
            Some(batch) => BatchMask::single(batch),
            None => BatchMask::ALL,
        }
    }

    /// Roster teachers of every stream, placeholders skipped.
    pub fn staff(&self) -> Vec<TeacherId> {
        self.streams.iter().filter_map(|s| s.teacher.staff()).collect()
    }

    pub fn is_placed(&self) -> bool {
        self.placement.is_some()
    }

    pub fn has_library(&self) -> bool {
        self.streams.iter().any(|s| s.subject == "Library")
    }
}
