use crate::config::DayLayout;
use crate::cost::CostModel;
use crate::data::{
    BatchEntry, DivisionName, PlacedSession, TimetableOutput, TimetableRequest, Timetable,
    UnplacedSession,
};
use crate::model::{
    DivisionId, RoomRef, Session, SessionKind, Teacher, TeacherRef, batch_label,
};
use crate::rooms::{RoomAllocator, RoomTable};
use crate::search::{Attempt, Reservation, SearchContext};
use crate::workload;
use itertools::Itertools;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::Instant;

/// Upper bound on attempts per request.
pub const MAX_RESTARTS: usize = 10_000;

/// Builds the weekly timetable for a request.
///
/// Validation problems are the only errors; sessions that cannot be placed
/// are reported in the output and never fail the request.
pub fn solve(input: &TimetableRequest) -> Result<TimetableOutput, String> {
    let start_time = Instant::now();
    let layout = DayLayout::from_config(&input.config)?;
    if input.solver.restarts == 0 {
        return Err("solver.restarts must be at least 1".to_string());
    }
    if input.solver.restarts > MAX_RESTARTS {
        return Err(format!(
            "solver.restarts {} is above the limit of {}",
            input.solver.restarts, MAX_RESTARTS
        ));
    }

    let seed = input.solver.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    info!(
        "Solving for {} divisions, {} teachers, {} days x {} slots (seed {})",
        input.divisions.values().map(Vec::len).sum::<usize>(),
        input.faculty.len(),
        layout.day_count(),
        layout.slots_per_day,
        seed
    );

    // workload: sessions and teacher loads, shared by every restart
    let plan = workload::generate(input, &mut rng)?;
    info!(
        "Generated {} sessions ({})",
        plan.sessions.len(),
        plan.sessions
            .iter()
            .map(|s| s.kind.label())
            .counts()
            .into_iter()
            .sorted()
            .map(|(kind, n)| format!("{kind} {n}"))
            .join(", ")
    );

    // lookups
    let division_ids: HashMap<&str, DivisionId> = plan
        .divisions
        .iter()
        .enumerate()
        .map(|(i, d)| (d.as_str(), i))
        .collect();
    let home_rooms: HashMap<DivisionId, String> = input
        .home_rooms
        .iter()
        .filter_map(|(div, room)| division_ids.get(div.as_str()).map(|&id| (id, room.clone())))
        .collect();
    let mut table = RoomTable::default();
    let rooms = RoomAllocator::new(&input.resources, &home_rooms, &input.lab_prefs, &mut table);
    let lab_bias = plan
        .divisions
        .iter()
        .map(|d| input.lab_bias.get(d).copied().unwrap_or_default())
        .collect();
    let cost = CostModel::new(lab_bias);
    let reservations = resolve_reservations(input, &layout, &division_ids);

    let ctx = SearchContext {
        plan: &plan,
        layout: &layout,
        rooms: &rooms,
        room_count: table.len(),
        cost: &cost,
        reservations: &reservations,
    };
    let (best, runs) = ctx.search(input.solver.restarts, &mut rng);

    let unplaced = describe_unplaced(&best, &plan.divisions);
    for u in &unplaced {
        warn!("Unplaced: {}", u);
    }
    info!(
        "Best of {} attempts: score {}, {} gaps, {} unplaced, in {:.2?}",
        runs,
        best.score,
        best.gaps,
        unplaced.len(),
        start_time.elapsed()
    );

    Ok(TimetableOutput {
        timetable: build_timetable(&best, &plan.divisions, &plan.teachers, &layout, &table),
        fitness_score: best.score,
        total_gaps: best.gaps,
        unplaced_lectures: unplaced.len(),
        unplaced,
        teacher_loads: plan.teachers.iter().map(Teacher::load_report).collect(),
        seed,
    })
}

// project reservations with unknown divisions or days are dropped
fn resolve_reservations(
    input: &TimetableRequest,
    layout: &DayLayout,
    division_ids: &HashMap<&str, DivisionId>,
) -> Vec<Reservation> {
    let mut reservations = Vec::new();
    for (div, days) in &input.project_reservations {
        let Some(&division) = division_ids.get(div.as_str()) else {
            warn!("Project reservation for unknown division {}", div);
            continue;
        };
        for (day_name, slots) in days {
            let Some(day) = layout.day_index(day_name) else {
                warn!("Project reservation for {} names unknown day {}", div, day_name);
                continue;
            };
            for &slot in slots {
                if !layout.is_teaching_slot(slot) {
                    warn!("Project reservation for {} on {} uses non-teaching slot {}", div, day_name, slot);
                    continue;
                }
                reservations.push(Reservation { division, day, slot });
            }
        }
    }
    debug!("{} project slots reserved", reservations.len());
    reservations
}

fn describe_unplaced(best: &Attempt, divisions: &[DivisionName]) -> Vec<UnplacedSession> {
    best.unplaced
        .iter()
        .map(|&(index, reason)| {
            let session = &best.sessions[index];
            UnplacedSession {
                division: divisions[session.division].clone(),
                kind: session.kind.label().to_string(),
                subject: subject_label(session),
                reason: reason.label().to_string(),
            }
        })
        .collect()
}

fn build_timetable(
    best: &Attempt,
    divisions: &[DivisionName],
    teachers: &[Teacher],
    layout: &DayLayout,
    table: &RoomTable,
) -> Timetable {
    let mut timetable = Timetable::new();
    for session in &best.sessions {
        let Some(placement) = &session.placement else {
            continue;
        };
        timetable
            .entry(divisions[session.division].clone())
            .or_default()
            .entry(layout.days[placement.day].clone())
            .or_default()
            .push(placed_session(session, &placement.rooms, teachers, table));
    }
    for day in timetable.values_mut().flat_map(|days| days.values_mut()) {
        day.sort_by_key(|s| s.slot);
    }
    timetable
}

fn teacher_name(teacher: TeacherRef, teachers: &[Teacher]) -> String {
    match teacher {
        TeacherRef::Staff(id) => teachers[id].name.clone(),
        TeacherRef::Vacant => "TBA".to_string(),
    }
}

fn subject_label(session: &Session) -> String {
    match session.kind {
        SessionKind::Elective => session.streams.iter().map(|s| &s.subject).join(" / "),
        _ => session.subject.clone(),
    }
}

fn placed_session(session: &Session, rooms: &[RoomRef], teachers: &[Teacher], table: &RoomTable) -> PlacedSession {
    let slot = session.placement.as_ref().map_or(0, |p| p.slot);
    let first_room = rooms.first().map_or_else(|| "TBA".to_string(), |r| table.display(r));
    let first_teacher = session
        .streams
        .first()
        .map_or_else(|| "TBA".to_string(), |s| teacher_name(s.teacher, teachers));

    let (room, teacher, batches) = match session.kind {
        SessionKind::Elective => (
            rooms.iter().map(|r| table.display(r)).join(" / "),
            session.streams.iter().map(|s| teacher_name(s.teacher, teachers)).join(" / "),
            Vec::new(),
        ),
        SessionKind::Lab => {
            let batches = session
                .streams
                .iter()
                .enumerate()
                .map(|(i, stream)| BatchEntry {
                    subject: stream.subject.clone(),
                    room: rooms.get(i).map_or_else(|| "TBA".to_string(), |r| table.display(r)),
                    teacher: teacher_name(stream.teacher, teachers),
                    batch: batch_label(i),
                })
                .collect();
            (first_room, first_teacher, batches)
        }
        SessionKind::Tutorial => {
            let batches = session
                .batch
                .map(|b| BatchEntry {
                    subject: session.subject.clone(),
                    room: first_room.clone(),
                    teacher: first_teacher.clone(),
                    batch: batch_label(b),
                })
                .into_iter()
                .collect();
            (first_room, first_teacher, batches)
        }
        SessionKind::Project => (first_room, "Guide".to_string(), Vec::new()),
        SessionKind::Theory => (first_room, first_teacher, Vec::new()),
    };

    PlacedSession {
        slot,
        duration: session.duration,
        kind: session.kind.label().to_string(),
        subject: subject_label(session),
        room,
        teacher,
        batches,
    }
}
