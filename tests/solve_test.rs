//! End-to-end tests of `solve` on small departments.

mod common;

use common::{request, rooms_of, sessions_of, subject, teacher, teachers_of, week};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use timetable_solver::solver::solve;

#[test]
fn test_single_theory_subject_spreads_over_distinct_days() {
    let req = request(json!({
        "config": week(),
        "resources": { "theory_rooms": ["301"], "lab_rooms": [] },
        "subjects": { "SE": [subject("Operating Systems", "Theory", 3)] },
        "faculty": [teacher("T1", "Dr. Kulkarni", &["Operating Systems"])],
        "divisions": { "SE": ["SE-A"] },
        "solver": { "restarts": 10, "seed": 1 }
    }));
    let output = solve(&req).unwrap();

    let placed = sessions_of(&output, "SE-A");
    assert_eq!(placed.len(), 3);
    let days: HashSet<&str> = placed.iter().map(|(day, _)| *day).collect();
    assert_eq!(days.len(), 3);
    assert!(placed.iter().all(|(_, s)| s.teacher == "Dr. Kulkarni" && s.room == "301"));
    assert_eq!(output.unplaced_lectures, 0);
    assert_eq!(output.total_gaps, 0);
    assert_eq!(output.fitness_score, 1_000_000);
    assert_eq!(output.teacher_loads[0].theory_load, 3);
    assert_eq!(output.teacher_loads[0].current_load, 3);
}

#[test]
fn test_two_lab_subjects_make_two_blocks() {
    let req = request(json!({
        "config": week(),
        "resources": { "theory_rooms": ["301"], "lab_rooms": ["L1", "L2", "L3"] },
        "subjects": { "SE": [subject("DBMS Lab", "Lab", 2), subject("CN Lab", "Lab", 2)] },
        "faculty": [
            teacher("T1", "Dr. Shah", &["DBMS Lab"]),
            teacher("T2", "Dr. Menon", &["CN Lab"])
        ],
        "divisions": { "SE": ["SE-A"] },
        "solver": { "restarts": 10, "seed": 3 }
    }));
    let output = solve(&req).unwrap();

    let labs: Vec<_> = sessions_of(&output, "SE-A")
        .into_iter()
        .filter(|(_, s)| s.kind == "LAB")
        .collect();
    assert_eq!(labs.len(), 2);
    for (_, lab) in &labs {
        assert_eq!(lab.duration, 2);
        assert!(lab.slot + 1 < 9);
        assert!(lab.slot != 4 && lab.slot + 1 != 4);
        assert_eq!(lab.batches.len(), 3);
        let subjects: HashSet<&str> = lab.batches.iter().map(|b| b.subject.as_str()).collect();
        assert_eq!(subjects, HashSet::from(["DBMS Lab", "CN Lab", "Free"]));
        let rooms = rooms_of(lab);
        assert_eq!(rooms.len(), 2);
        assert!(rooms.len() <= 3);
        let free = lab.batches.iter().find(|b| b.subject == "Free").unwrap();
        assert_eq!(free.room, "TBA");
        assert_eq!(free.teacher, "TBA");
    }
    // Two appearances of each subject, two slots each.
    for load in &output.teacher_loads {
        assert_eq!(load.lab_load, 4);
        assert_eq!(load.current_load, load.theory_load + load.lab_load);
    }
}

#[test]
fn test_department_has_no_double_bookings() {
    let req = request(json!({
        "config": week(),
        "resources": {
            "theory_rooms": ["301", "302", "303"],
            "lab_rooms": ["L1", "L2", "L3", "L4", "WebLab"],
            "maths_room": "M1"
        },
        "subjects": {
            "SE": [
                subject("Operating Systems", "Theory", 3),
                subject("Computer Networks", "Theory", 3),
                subject("Discrete Maths", "Theory", 2),
                subject("OS Lab", "Lab", 2),
                subject("Web Lab", "Lab", 2),
                subject("DSA Lab", "Lab", 2),
                subject("Maths Tutorial", "Tutorial", 1)
            ],
            "BE": [
                subject("Cloud", "Theory", 3),
                subject("UI Design", "Elective", 2),
                subject("Blockchain", "Elective", 2),
                subject("Major Project", "Theory", 4)
            ]
        },
        "lab_prefs": { "Web": ["WebLab"] },
        "home_rooms": { "SE-A": "301", "SE-B": "302", "BE-A": "303" },
        "faculty": [
            teacher("T1", "Dr. Kulkarni", &["Operating Systems", "OS Lab"]),
            teacher("T2", "Dr. Menon", &["Computer Networks", "Web Lab"]),
            teacher("T3", "Dr. Shah", &["Discrete Maths", "Maths Tutorial"]),
            teacher("T4", "Dr. Iyer", &["DSA Lab", "Cloud"]),
            teacher("T5", "Dr. Rao", &["UI Design"]),
            teacher("T6", "Dr. Das", &["Blockchain", "Operating Systems"]),
            teacher("T7", "Dr. Pillai", &["Computer Networks", "OS Lab", "DSA Lab"])
        ],
        "allocations": [
            { "teacher_id": "T6", "subject_name": "Operating Systems", "division": "SE-B" }
        ],
        "divisions": { "SE": ["SE-A", "SE-B"], "BE": ["BE-A"] },
        "lab_bias": { "SE-A": "Morning" },
        "project_reservations": { "BE-A": { "Fri": [5, 6, 7, 8] } },
        "solver": { "restarts": 30, "seed": 2024 }
    }));
    let output = solve(&req).unwrap();

    let mut teachers: HashMap<(String, usize), usize> = HashMap::new();
    let mut rooms: HashMap<(String, usize), usize> = HashMap::new();
    for division in ["SE-A", "SE-B", "BE-A"] {
        let mut whole: HashSet<(String, usize)> = HashSet::new();
        let mut batches: HashMap<(String, usize), Vec<String>> = HashMap::new();
        for (day, s) in sessions_of(&output, division) {
            for slot in s.slot..s.slot + s.duration {
                assert_ne!(slot, 4, "{division} uses recess on {day}");
                assert!(slot < 9);
                let key = (day.to_string(), slot);
                for t in teachers_of(s) {
                    *teachers.entry((format!("{day}:{t}"), slot)).or_default() += 1;
                }
                for r in rooms_of(s) {
                    *rooms.entry((format!("{day}:{r}"), slot)).or_default() += 1;
                }
                if s.kind == "TUTORIAL" {
                    let taken = batches.entry(key.clone()).or_default();
                    let batch = s.batches[0].batch.clone();
                    assert!(!taken.contains(&batch), "{division} batch {batch} twice on {day}");
                    taken.push(batch);
                    assert!(!whole.contains(&key));
                } else {
                    assert!(whole.insert(key.clone()), "{division} double-booked on {day} at {slot}");
                    assert!(!batches.contains_key(&key));
                }
            }
        }
    }
    assert!(teachers.values().all(|&n| n == 1), "a teacher is double-booked");
    assert!(rooms.values().all(|&n| n == 1), "a room is double-booked");

    // Friday afternoon of BE-A belongs to the project.
    let be_fri: Vec<_> = sessions_of(&output, "BE-A")
        .into_iter()
        .filter(|(day, s)| *day == "Fri" && s.slot >= 5)
        .collect();
    assert_eq!(be_fri.len(), 4);
    assert!(be_fri.iter().all(|(_, s)| s.kind == "PROJECT"));

    // Explicit allocation and automatic budgets.
    for load in &output.teacher_loads {
        assert_eq!(load.current_load, load.theory_load + load.lab_load);
        assert!(load.current_load <= load.max_load, "{} over budget", load.name);
    }
    assert_eq!(output.unplaced.len(), output.unplaced_lectures);
    assert_eq!(output.unplaced_lectures, 0);
    assert_eq!(output.total_gaps, 0);
}

#[test]
fn test_elective_bundle_with_one_skilled_teacher_is_placed() {
    let req = request(json!({
        "config": week(),
        "resources": { "theory_rooms": ["301", "302"], "lab_rooms": [] },
        "subjects": { "BE": [subject("UI Design", "Elective", 2), subject("Blockchain", "Elective", 2)] },
        "faculty": [
            teacher("T1", "Dr. Rao", &["UI Design", "Blockchain"]),
            teacher("T2", "Dr. Das", &[])
        ],
        "divisions": { "BE": ["BE-A"] },
        "solver": { "restarts": 10, "seed": 7 }
    }));
    let output = solve(&req).unwrap();

    assert_eq!(output.unplaced_lectures, 0);
    let bundles = sessions_of(&output, "BE-A");
    assert_eq!(bundles.len(), 2);
    for (_, bundle) in &bundles {
        assert_eq!(bundle.kind, "ELECTIVE");
        let names: HashSet<String> = teachers_of(bundle).into_iter().collect();
        assert_eq!(names, HashSet::from(["Dr. Rao".to_string(), "Dr. Das".to_string()]));
        assert_eq!(rooms_of(bundle).len(), 2);
    }
}

#[test]
fn test_seed_is_reported_and_reproducible() {
    let body = json!({
        "config": week(),
        "resources": { "theory_rooms": ["301", "302"], "lab_rooms": [] },
        "subjects": { "SE": [subject("OS", "Theory", 3), subject("CN", "Theory", 3)] },
        "faculty": [teacher("T1", "Dr. Kulkarni", &["OS"]), teacher("T2", "Dr. Menon", &["CN"])],
        "divisions": { "SE": ["SE-A", "SE-B"] },
        "solver": { "restarts": 5 }
    });
    let first = solve(&request(body.clone())).unwrap();

    let mut pinned = body;
    pinned["solver"]["seed"] = json!(first.seed);
    let second = solve(&request(pinned)).unwrap();
    assert_eq!(first.timetable, second.timetable);
    assert_eq!(first.fitness_score, second.fitness_score);
}

#[test]
fn test_bad_layouts_are_rejected() {
    let req = request(json!({
        "config": { "slots_per_day": 6, "recess_index": 6, "days": ["Mon"] },
        "divisions": { "SE": ["SE-A"] }
    }));
    let err = solve(&req).unwrap_err();
    assert!(err.contains("recess_index"));

    let req = request(json!({
        "config": { "days": [] },
        "divisions": { "SE": ["SE-A"] }
    }));
    assert!(solve(&req).is_err());

    let req = request(json!({
        "config": week(),
        "divisions": { "SE": ["SE-A"], "TE": ["SE-A"] }
    }));
    assert!(solve(&req).is_err());

    let req = request(json!({
        "config": week(),
        "resources": { "theory_rooms": ["301"], "lab_rooms": [], "maths_room": "M1" },
        "subjects": { "SE": [subject("Maths Tutorial", "Tutorial", 2_000_000_000)] },
        "faculty": [teacher("T1", "Dr. Shah", &["Maths Tutorial"])],
        "divisions": { "SE": ["SE-A"] }
    }));
    assert!(solve(&req).unwrap_err().contains("weekly_load"));

    let req = request(json!({
        "config": week(),
        "divisions": { "SE": ["SE-A"] },
        "solver": { "restarts": 1_000_000_000_u64 }
    }));
    assert!(solve(&req).unwrap_err().contains("restarts"));
}
