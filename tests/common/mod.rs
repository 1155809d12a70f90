//! Request builders shared across integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use timetable_solver::data::{PlacedSession, TimetableOutput, TimetableRequest};

/// A five-day, nine-slot week with recess at index 4.
pub fn week() -> Value {
    json!({
        "slots_per_day": 9,
        "recess_index": 4,
        "days": ["Mon", "Tue", "Wed", "Thu", "Fri"]
    })
}

pub fn teacher(id: &str, name: &str, skills: &[&str]) -> Value {
    json!({ "id": id, "name": name, "role": "Faculty", "experience": 3, "skills": skills })
}

pub fn subject(name: &str, kind: &str, load: u32) -> Value {
    json!({ "name": name, "code": "", "type": kind, "weekly_load": load })
}

pub fn request(value: Value) -> TimetableRequest {
    serde_json::from_value(value).expect("request should deserialize")
}

/// Every session of a division across the week, with its day.
pub fn sessions_of<'a>(output: &'a TimetableOutput, division: &str) -> Vec<(&'a str, &'a PlacedSession)> {
    output
        .timetable
        .get(division)
        .map(|days| {
            days.iter()
                .flat_map(|(day, sessions)| sessions.iter().map(move |s| (day.as_str(), s)))
                .collect()
        })
        .unwrap_or_default()
}

/// Real teacher names a session occupies.
pub fn teachers_of(session: &PlacedSession) -> Vec<String> {
    let names: Vec<String> = if session.kind == "LAB" {
        session.batches.iter().map(|b| b.teacher.clone()).collect()
    } else {
        session.teacher.split(" / ").map(str::to_string).collect()
    };
    names
        .into_iter()
        .filter(|n| n != "TBA" && n != "Guide")
        .collect()
}

/// Tracked room labels a session occupies.
pub fn rooms_of(session: &PlacedSession) -> Vec<String> {
    let rooms: Vec<String> = if session.kind == "LAB" {
        session.batches.iter().map(|b| b.room.clone()).collect()
    } else {
        session.room.split(" / ").map(str::to_string).collect()
    };
    rooms
        .into_iter()
        .filter(|r| r != "TBA" && r != "Project Lab")
        .collect()
}
