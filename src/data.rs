use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// Type aliases for clarity
pub type DivisionName = String;
pub type DayName = String;
pub type RoomLabel = String;
pub type Timeslot = usize;

/// Day layout: how many teaching slots a day has and which one is recess.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_slots_per_day")]
    pub slots_per_day: usize,
    #[serde(default = "default_recess_index")]
    pub recess_index: usize,
    pub days: Vec<DayName>,
}

fn default_slots_per_day() -> usize {
    9
}

fn default_recess_index() -> usize {
    4
}

/// The three disjoint room pools.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoomPools {
    #[serde(default)]
    pub theory_rooms: Vec<RoomLabel>,
    #[serde(default)]
    pub lab_rooms: Vec<RoomLabel>,
    /// Fixed room for tutorials (the "maths room").
    #[serde(default, alias = "overflow_room")]
    pub maths_room: Option<RoomLabel>,
}

/// A faculty member as submitted by the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeacherInput {
    pub id: String,
    pub name: String,
    /// "HOD", "Div Incharge" or "Faculty".
    pub role: String,
    #[serde(default)]
    pub experience: u32,
    /// "A" (morning), "B" (afternoon), anything else is unrestricted.
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SubjectKind {
    Theory,
    Lab,
    Elective,
    Tutorial,
}

/// One subject of an academic year with its weekly load in slots.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubjectInput {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub weekly_load: u32,
}

/// An explicit teacher choice for one subject in one division.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocationInput {
    pub teacher_id: String,
    pub subject_name: String,
    pub division: DivisionName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DayPart {
    Morning,
    #[default]
    Afternoon,
}

/// Knobs for the restart search.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverOptions {
    #[serde(default = "default_restarts")]
    pub restarts: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_restarts() -> usize {
    100
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            restarts: default_restarts(),
            seed: None,
        }
    }
}

/// The complete input bundle for one timetable request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimetableRequest {
    pub config: TimingConfig,
    #[serde(default)]
    pub resources: RoomPools,
    /// Subjects keyed by academic year ("SE", "TE", ...).
    #[serde(default)]
    pub subjects: HashMap<String, Vec<SubjectInput>>,
    /// Subject-name substring to preferred lab rooms, matched in key order.
    #[serde(default)]
    pub lab_prefs: BTreeMap<String, Vec<RoomLabel>>,
    #[serde(default)]
    pub home_rooms: HashMap<DivisionName, RoomLabel>,
    #[serde(default)]
    pub faculty: Vec<TeacherInput>,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
    /// Academic year to its divisions.
    pub divisions: BTreeMap<String, Vec<DivisionName>>,
    #[serde(default)]
    pub lab_bias: HashMap<DivisionName, DayPart>,
    /// Division -> day name -> slots reserved for the weekly project block.
    #[serde(default)]
    pub project_reservations: BTreeMap<DivisionName, BTreeMap<DayName, Vec<Timeslot>>>,
    #[serde(default)]
    pub solver: SolverOptions,
}

/// One parallel stream inside a lab block or elective bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub subject: String,
    pub room: RoomLabel,
    pub teacher: String,
    pub batch: String,
}

/// A single booked session as shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedSession {
    pub slot: Timeslot,
    pub duration: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub room: RoomLabel,
    pub teacher: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batches: Vec<BatchEntry>,
}

/// A session the search could not place in the returned attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedSession {
    pub division: DivisionName,
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub reason: String,
}

impl fmt::Display for UnplacedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({})",
            self.division, self.kind, self.subject, self.reason
        )
    }
}

/// Load bookkeeping of one teacher after workload generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherLoad {
    pub id: String,
    pub name: String,
    pub role: String,
    pub current_load: u32,
    pub theory_load: u32,
    pub lab_load: u32,
    pub max_load: u32,
    pub min_target: u32,
}

/// Division -> day name -> sessions ordered by start slot.
pub type Timetable = BTreeMap<DivisionName, BTreeMap<DayName, Vec<PlacedSession>>>;

/// The final output of the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableOutput {
    pub timetable: Timetable,
    pub fitness_score: i64,
    pub total_gaps: usize,
    pub unplaced_lectures: usize,
    pub unplaced: Vec<UnplacedSession>,
    pub teacher_loads: Vec<TeacherLoad>,
    pub seed: u64,
}
