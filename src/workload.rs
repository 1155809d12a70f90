//! Workload generation: expands subjects x divisions into the flat list of
//! sessions the search places, choosing one teacher per (division, subject).
//!
//! Teacher load counters are charged here, once, and never touched again by
//! the search.

use itertools::Itertools;
use log::{trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

use crate::data::{AllocationInput, SubjectInput, SubjectKind, TeacherInput, TimetableRequest};
use crate::model::{
    BATCH_COUNT, DivisionId, LoadKind, Session, Stream, Teacher, TeacherId, TeacherRef,
    is_placeholder_subject,
};

/// Immutable output of workload generation, shared by every restart.
#[derive(Debug, Clone)]
pub struct WorkloadPlan {
    pub divisions: Vec<String>,
    pub teachers: Vec<Teacher>,
    pub sessions: Vec<Session>,
}

/// Chooses teachers and keeps their load books.
#[derive(Debug)]
pub struct TeacherAllocator {
    teachers: Vec<Teacher>,
    by_id: HashMap<String, TeacherId>,
    explicit: HashMap<(String, String), String>,
    memo: HashMap<(DivisionId, String), TeacherRef>,
}

impl TeacherAllocator {
    pub fn new(faculty: &[TeacherInput], allocations: &[AllocationInput]) -> Self {
        let teachers: Vec<Teacher> = faculty.iter().map(Teacher::new).collect();
        let by_id = teachers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        let mut explicit = HashMap::new();
        for a in allocations {
            // First allocation for a pair wins.
            explicit
                .entry((a.division.clone(), a.subject_name.clone()))
                .or_insert_with(|| a.teacher_id.clone());
        }
        Self {
            teachers,
            by_id,
            explicit,
            memo: HashMap::new(),
        }
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn into_teachers(self) -> Vec<Teacher> {
        self.teachers
    }

    /// Teacher for `subject` in a division, chosen on first request and
    /// charged `load` slots of `kind`. Later requests for the same pair
    /// return the same teacher without charging again.
    ///
    /// `taken` holds teachers already teaching a parallel stream of the same
    /// block; automatic choices skip them.
    pub fn allocate(
        &mut self,
        division: DivisionId,
        division_name: &str,
        subject: &str,
        load: u32,
        kind: LoadKind,
        taken: &[TeacherId],
    ) -> TeacherRef {
        let key = (division, subject.to_string());
        if let Some(&chosen) = self.memo.get(&key) {
            return chosen;
        }
        let chosen = self.choose(division_name, subject, load, kind, taken);
        if let TeacherRef::Staff(id) = chosen {
            self.teachers[id].charge(load, kind);
            trace!(
                "{} {} -> {} (load {}/{})",
                division_name,
                subject,
                self.teachers[id].name,
                self.teachers[id].current_load,
                self.teachers[id].caps.max_load
            );
        }
        self.memo.insert(key, chosen);
        chosen
    }

    fn choose(
        &self,
        division_name: &str,
        subject: &str,
        load: u32,
        kind: LoadKind,
        taken: &[TeacherId],
    ) -> TeacherRef {
        let key = (division_name.to_string(), subject.to_string());
        if let Some(teacher_id) = self.explicit.get(&key) {
            match self.by_id.get(teacher_id) {
                Some(&id) => {
                    if taken.contains(&id) {
                        warn!(
                            "allocation of {} for {} in {} repeats a teacher of the same block",
                            teacher_id, subject, division_name
                        );
                    }
                    return TeacherRef::Staff(id);
                }
                None => warn!(
                    "allocation of {} for {} in {} names an unknown teacher",
                    teacher_id, subject, division_name
                ),
            }
        }

        let free = |i: &TeacherId| !taken.contains(i);
        let candidates: Vec<TeacherId> = (0..self.teachers.len())
            .filter(free)
            .filter(|&i| self.teachers[i].can_take_load(load, kind))
            .collect();
        let skilled: Vec<TeacherId> = candidates
            .iter()
            .copied()
            .filter(|&i| self.teachers[i].has_skill(subject))
            .collect();
        let pool = if skilled.is_empty() { &candidates } else { &skilled };
        if let Some(&id) = pool
            .iter()
            .min_by_key(|&&i| (!self.teachers[i].is_below_target(), self.teachers[i].current_load))
        {
            return TeacherRef::Staff(id);
        }

        // Nobody has room in the per-kind budget; settle for total budget.
        let fallback = (0..self.teachers.len())
            .filter(free)
            .filter(|&i| self.teachers[i].fits_total(load))
            .min_by_key(|&i| self.teachers[i].current_load);
        match fallback {
            Some(id) => {
                trace!("{} in {}: no {:?} budget left, falling back", subject, division_name, kind);
                TeacherRef::Staff(id)
            }
            None => {
                trace!("{} in {}: no teacher has capacity, marking TBA", subject, division_name);
                TeacherRef::Vacant
            }
        }
    }
}

/// Rotated round-robin grouping of lab tokens into three parallel batches.
///
/// Token `i` heads block `i`; batches two and three take the tokens one and
/// two shifts further along. A subject already present earlier in a block is
/// replaced by a "Free" placeholder so no block repeats a subject.
pub fn lab_triplets(tokens: &[String]) -> Vec<[String; BATCH_COUNT]> {
    let n = tokens.len();
    if n == 0 {
        return Vec::new();
    }
    let shift = if n >= BATCH_COUNT { n / BATCH_COUNT } else { 1 };
    (0..n)
        .map(|i| {
            let mut block: [String; BATCH_COUNT] =
                std::array::from_fn(|b| tokens[(i + b * shift) % n].clone());
            for b in 1..BATCH_COUNT {
                if block[..b].contains(&block[b]) {
                    block[b] = "Free".to_string();
                }
            }
            block
        })
        .collect()
}

/// Expands the request into sessions and assigns teachers.
pub fn generate<R: Rng>(request: &TimetableRequest, rng: &mut R) -> Result<WorkloadPlan, String> {
    let mut divisions: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for divs in request.divisions.values() {
        for div in divs {
            if !seen.insert(div.as_str()) {
                return Err(format!("division {div} is listed more than once"));
            }
            divisions.push(div.clone());
        }
    }

    // A subject can never need more slots than the week has.
    let week_slots = request.config.days.len().saturating_mul(request.config.slots_per_day);
    for (year, subjects) in &request.subjects {
        if let Some(sub) = subjects.iter().find(|s| s.weekly_load as usize > week_slots) {
            return Err(format!(
                "weekly_load {} of {} in {} exceeds the {} slots of a week",
                sub.weekly_load, sub.name, year, week_slots
            ));
        }
    }

    let mut allocator = TeacherAllocator::new(&request.faculty, &request.allocations);
    let mut sessions = Vec::new();
    let no_subjects: Vec<SubjectInput> = Vec::new();

    for (year, divs) in &request.divisions {
        let subjects = request.subjects.get(year).unwrap_or(&no_subjects);
        let by_kind = subjects
            .iter()
            .filter(|s| !s.name.contains("Project") && s.weekly_load > 0)
            .into_group_map_by(|s| s.kind);
        let of_kind = |kind: SubjectKind| by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[]);

        for name in divs {
            let Some(div) = divisions.iter().position(|d| d == name) else {
                continue;
            };

            for sub in of_kind(SubjectKind::Theory) {
                let teacher = allocator.allocate(div, name, &sub.name, sub.weekly_load, LoadKind::Theory, &[]);
                sessions.extend((0..sub.weekly_load).map(|_| Session::theory(div, &sub.name, teacher)));
            }

            let electives = of_kind(SubjectKind::Elective);
            if let Some(load) = electives.iter().map(|e| e.weekly_load).max() {
                let mut streams: Vec<Stream> = Vec::with_capacity(electives.len());
                for e in electives {
                    let taken: Vec<TeacherId> = streams.iter().filter_map(|s| s.teacher.staff()).collect();
                    streams.push(Stream {
                        subject: e.name.clone(),
                        teacher: allocator.allocate(div, name, &e.name, load, LoadKind::Theory, &taken),
                    });
                }
                sessions.extend((0..load).map(|_| Session::elective_block(div, streams.clone())));
            }

            let mut tokens: Vec<String> = of_kind(SubjectKind::Lab)
                .iter()
                .flat_map(|sub| std::iter::repeat_n(sub.name.clone(), sub.weekly_load.div_ceil(2) as usize))
                .collect();
            tokens.shuffle(rng);
            let blocks = lab_triplets(&tokens);
            let appearances = blocks.iter().flatten().counts();
            let mut lab_teachers: HashMap<&str, TeacherRef> = HashMap::new();
            for subject in blocks.iter().flatten().unique() {
                let teacher = if is_placeholder_subject(subject) {
                    TeacherRef::Vacant
                } else {
                    // Teachers of subjects sharing any block with this one.
                    let taken: Vec<TeacherId> = blocks
                        .iter()
                        .filter(|block| block.contains(subject))
                        .flatten()
                        .filter_map(|other| lab_teachers.get(other.as_str()))
                        .filter_map(|t| t.staff())
                        .unique()
                        .collect();
                    let slots = u32::try_from(appearances[subject])
                        .unwrap_or(u32::MAX)
                        .saturating_mul(2);
                    allocator.allocate(div, name, subject, slots, LoadKind::Lab, &taken)
                };
                lab_teachers.insert(subject.as_str(), teacher);
            }
            for block in &blocks {
                let streams = block
                    .iter()
                    .map(|subject| Stream {
                        subject: subject.clone(),
                        teacher: lab_teachers[subject.as_str()],
                    })
                    .collect();
                sessions.push(Session::lab_block(div, streams));
            }

            for sub in of_kind(SubjectKind::Tutorial) {
                let load = sub
                    .weekly_load
                    .checked_mul(BATCH_COUNT as u32)
                    .ok_or_else(|| format!("weekly_load of {} is too large", sub.name))?;
                let teacher = allocator.allocate(div, name, &sub.name, load, LoadKind::Theory, &[]);
                for _ in 0..sub.weekly_load {
                    sessions.extend((0..BATCH_COUNT).map(|b| Session::tutorial(div, &sub.name, teacher, b)));
                }
            }
        }
    }

    Ok(WorkloadPlan {
        divisions,
        teachers: allocator.into_teachers(),
        sessions,
    })
}
