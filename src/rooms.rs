//! Room interning and placement-time room resolution.

use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::data::{RoomLabel, RoomPools};
use crate::grid::{Claim, Grid};
use crate::model::{
    DayIndex, DivisionId, RoomId, RoomRef, Session, SessionKind, SlotIndex, Stream,
    is_placeholder_subject,
};

/// Interns room labels so occupancy can be tracked in flat arrays.
#[derive(Debug, Clone, Default)]
pub struct RoomTable {
    labels: Vec<RoomLabel>,
    index: HashMap<RoomLabel, RoomId>,
}

impl RoomTable {
    pub fn intern(&mut self, label: &str) -> RoomId {
        if let Some(&id) = self.index.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), id);
        id
    }

    pub fn id(&self, label: &str) -> Option<RoomId> {
        self.index.get(label).copied()
    }

    pub fn label(&self, id: RoomId) -> &str {
        &self.labels[id]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn display(&self, room: &RoomRef) -> String {
        match room {
            RoomRef::Tracked(id) => self.label(*id).to_string(),
            RoomRef::Untracked(label) => label.clone(),
        }
    }
}

/// Picks rooms for a session at a candidate (day, slot).
#[derive(Debug, Clone)]
pub struct RoomAllocator {
    theory: Vec<RoomId>,
    /// Lab rooms not reserved for any preference key.
    general_labs: Vec<RoomId>,
    overflow: Option<RoomId>,
    home: HashMap<DivisionId, RoomId>,
    lab_prefs: Vec<(String, Vec<RoomId>)>,
}

impl RoomAllocator {
    pub fn new(
        pools: &RoomPools,
        home_rooms: &HashMap<DivisionId, RoomLabel>,
        lab_prefs: &BTreeMap<String, Vec<RoomLabel>>,
        table: &mut RoomTable,
    ) -> Self {
        let theory: Vec<RoomId> = pools.theory_rooms.iter().map(|r| table.intern(r)).collect();
        let labs: Vec<RoomId> = pools.lab_rooms.iter().map(|r| table.intern(r)).collect();
        let overflow = pools.maths_room.as_deref().map(|r| table.intern(r));

        let lab_prefs: Vec<(String, Vec<RoomId>)> = lab_prefs
            .iter()
            .map(|(key, rooms)| (key.clone(), rooms.iter().map(|r| table.intern(r)).collect()))
            .collect();
        let reserved: HashSet<RoomId> = lab_prefs
            .iter()
            .flat_map(|(_, rooms)| rooms.iter().copied())
            .collect();
        let general_labs = labs.into_iter().filter(|r| !reserved.contains(r)).collect();

        // Sorted so room ids do not depend on hash order.
        let home: HashMap<DivisionId, RoomId> = home_rooms
            .iter()
            .sorted_by_key(|(div, _)| **div)
            .map(|(&div, label)| (div, table.intern(label)))
            .collect();

        Self {
            theory,
            general_labs,
            overflow,
            home,
            lab_prefs,
        }
    }

    /// Divisions without a declared home room fall back to the first theory room.
    pub fn home_room(&self, division: DivisionId) -> Option<RoomId> {
        self.home
            .get(&division)
            .copied()
            .or_else(|| self.theory.first().copied())
    }

    /// Preferred rooms for a lab subject: the first preference key contained
    /// in the subject name wins.
    pub fn preferred_rooms(&self, subject: &str) -> &[RoomId] {
        if is_placeholder_subject(subject) {
            return &[];
        }
        self.lab_prefs
            .iter()
            .find(|(key, _)| subject.contains(key.as_str()))
            .map(|(_, rooms)| rooms.as_slice())
            .unwrap_or(&[])
    }

    fn room_free(grid: &Grid, day: DayIndex, slot: SlotIndex, duration: usize, room: RoomId) -> bool {
        grid.is_free(day, slot, duration, &Claim::rooms(&[room]))
    }

    /// Home room if free, otherwise any free theory room.
    pub fn theory_room<R: Rng>(
        &self,
        grid: &Grid,
        rng: &mut R,
        day: DayIndex,
        slot: SlotIndex,
        division: DivisionId,
    ) -> Option<RoomId> {
        let home = self.home_room(division);
        if let Some(home) = home {
            if Self::room_free(grid, day, slot, 1, home) {
                return Some(home);
            }
        }
        let mut pool: Vec<RoomId> = self.theory.iter().copied().filter(|r| Some(*r) != home).collect();
        pool.shuffle(rng);
        pool.into_iter().find(|&r| Self::room_free(grid, day, slot, 1, r))
    }

    /// `count` distinct free theory rooms, home room first when free.
    pub fn elective_rooms<R: Rng>(
        &self,
        grid: &Grid,
        rng: &mut R,
        day: DayIndex,
        slot: SlotIndex,
        division: DivisionId,
        count: usize,
    ) -> Option<Vec<RoomId>> {
        let home = self.home_room(division);
        let mut chosen = Vec::with_capacity(count);
        if let Some(home) = home {
            if Self::room_free(grid, day, slot, 1, home) {
                chosen.push(home);
            }
        }
        let mut pool: Vec<RoomId> = self.theory.iter().copied().filter(|r| Some(*r) != home).collect();
        pool.shuffle(rng);
        for r in pool {
            if chosen.len() >= count {
                break;
            }
            if Self::room_free(grid, day, slot, 1, r) {
                chosen.push(r);
            }
        }
        chosen.truncate(count);
        (chosen.len() == count).then_some(chosen)
    }

    /// One room per parallel stream of a lab block, all or nothing.
    pub fn lab_rooms<R: Rng>(
        &self,
        grid: &Grid,
        rng: &mut R,
        day: DayIndex,
        start: SlotIndex,
        duration: usize,
        streams: &[Stream],
    ) -> Option<Vec<RoomRef>> {
        let mut chosen: Vec<Option<RoomRef>> = vec![None; streams.len()];
        let taken = |chosen: &[Option<RoomRef>], room: RoomId| {
            chosen.iter().flatten().any(|c| c.tracked() == Some(room))
        };

        for (i, stream) in streams.iter().enumerate() {
            for &room in self.preferred_rooms(&stream.subject) {
                if !taken(&chosen, room) && Self::room_free(grid, day, start, duration, room) {
                    chosen[i] = Some(RoomRef::Tracked(room));
                    break;
                }
            }
        }

        let mut pool = self.general_labs.clone();
        pool.shuffle(rng);
        for (i, stream) in streams.iter().enumerate() {
            if chosen[i].is_some() {
                continue;
            }
            if is_placeholder_subject(&stream.subject) {
                chosen[i] = Some(RoomRef::tba());
                continue;
            }
            let free = pool
                .iter()
                .copied()
                .find(|&r| !taken(&chosen, r) && Self::room_free(grid, day, start, duration, r));
            chosen[i] = free.map(RoomRef::Tracked);
        }

        chosen.into_iter().collect()
    }

    /// The fixed overflow room, or a theory room when none is configured.
    pub fn tutorial_room<R: Rng>(
        &self,
        grid: &Grid,
        rng: &mut R,
        day: DayIndex,
        slot: SlotIndex,
        division: DivisionId,
    ) -> Option<RoomId> {
        match self.overflow {
            Some(room) => Self::room_free(grid, day, slot, 1, room).then_some(room),
            None => self.theory_room(grid, rng, day, slot, division),
        }
    }

    /// Rooms for `session` starting at (day, slot), or `None` when the
    /// session cannot get every room it needs there.
    pub fn resolve<R: Rng>(
        &self,
        grid: &Grid,
        rng: &mut R,
        session: &Session,
        day: DayIndex,
        slot: SlotIndex,
    ) -> Option<Vec<RoomRef>> {
        match session.kind {
            SessionKind::Theory => self
                .theory_room(grid, rng, day, slot, session.division)
                .map(|r| vec![RoomRef::Tracked(r)]),
            SessionKind::Elective => self
                .elective_rooms(grid, rng, day, slot, session.division, session.streams.len())
                .map(|rooms| rooms.into_iter().map(RoomRef::Tracked).collect()),
            SessionKind::Lab => {
                self.lab_rooms(grid, rng, day, slot, session.duration, &session.streams)
            }
            SessionKind::Tutorial => self
                .tutorial_room(grid, rng, day, slot, session.division)
                .map(|r| vec![RoomRef::Tracked(r)]),
            SessionKind::Project => Some(vec![RoomRef::Untracked("Project Lab".to_string())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DayLayout;
    use crate::data::TimingConfig;
    use crate::model::TeacherRef;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn layout() -> DayLayout {
        DayLayout::from_config(&TimingConfig {
            slots_per_day: 9,
            recess_index: 4,
            days: vec!["Mon".into(), "Tue".into()],
        })
        .unwrap()
    }

    fn setup(prefs: &[(&str, &[&str])]) -> (RoomAllocator, RoomTable) {
        let pools = RoomPools {
            theory_rooms: vec!["701".into(), "702".into(), "703".into()],
            lab_rooms: vec!["801".into(), "802".into(), "803".into(), "804".into()],
            maths_room: Some("902".into()),
        };
        let home: HashMap<DivisionId, RoomLabel> = [(0, "702".to_string())].into_iter().collect();
        let prefs: BTreeMap<String, Vec<RoomLabel>> = prefs
            .iter()
            .map(|(k, rooms)| (k.to_string(), rooms.iter().map(|r| r.to_string()).collect()))
            .collect();
        let mut table = RoomTable::default();
        let allocator = RoomAllocator::new(&pools, &home, &prefs, &mut table);
        (allocator, table)
    }

    fn stream(subject: &str) -> Stream {
        Stream {
            subject: subject.to_string(),
            teacher: TeacherRef::Vacant,
        }
    }

    fn book_room(grid: &mut Grid, sessions: &mut Vec<Session>, room: RoomId, day: DayIndex, slot: SlotIndex, duration: usize) {
        let mut s = Session::theory(1, "Filler", TeacherRef::Vacant);
        s.duration = duration;
        sessions.push(s);
        let idx = sessions.len() - 1;
        grid.book(idx, &mut sessions[idx], day, slot, vec![RoomRef::Tracked(room)]);
    }

    #[test]
    fn test_theory_prefers_home_room_then_pool() {
        let (alloc, table) = setup(&[]);
        let mut grid = Grid::new(layout(), 2, Vec::new(), table.len());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let home = table.id("702").unwrap();
        assert_eq!(alloc.theory_room(&grid, &mut rng, 0, 0, 0), Some(home));

        let mut sessions = Vec::new();
        book_room(&mut grid, &mut sessions, home, 0, 0, 1);
        let other = alloc.theory_room(&grid, &mut rng, 0, 0, 0).unwrap();
        assert_ne!(other, home);
        assert!(["701", "703"].contains(&table.label(other)));
    }

    #[test]
    fn test_electives_need_distinct_rooms() {
        let (alloc, table) = setup(&[]);
        let mut grid = Grid::new(layout(), 2, Vec::new(), table.len());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let rooms = alloc.elective_rooms(&grid, &mut rng, 0, 1, 0, 2).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_ne!(rooms[0], rooms[1]);
        assert_eq!(rooms[0], table.id("702").unwrap());

        let mut sessions = Vec::new();
        book_room(&mut grid, &mut sessions, table.id("701").unwrap(), 0, 1, 1);
        book_room(&mut grid, &mut sessions, table.id("703").unwrap(), 0, 1, 1);
        assert!(alloc.elective_rooms(&grid, &mut rng, 0, 1, 0, 2).is_none());
    }

    #[test]
    fn test_lab_preferences_and_placeholders() {
        let (alloc, table) = setup(&[("Web", &["804"])]);
        let grid = Grid::new(layout(), 2, Vec::new(), table.len());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let streams = vec![stream("WebX Lab"), stream("DBMS Lab"), stream("Library")];
        let rooms = alloc.lab_rooms(&grid, &mut rng, 0, 5, 2, &streams).unwrap();
        assert_eq!(rooms[0], RoomRef::Tracked(table.id("804").unwrap()));
        assert_ne!(rooms[1], rooms[0]);
        assert!(["801", "802", "803"].contains(&table.display(&rooms[1]).as_str()));
        assert_eq!(rooms[2], RoomRef::tba());
    }

    #[test]
    fn test_lab_allocation_is_all_or_nothing() {
        let (alloc, table) = setup(&[("Web", &["804"])]);
        let mut grid = Grid::new(layout(), 2, Vec::new(), table.len());
        let mut sessions = Vec::new();
        // Two of the three general lab rooms are taken for the block.
        book_room(&mut grid, &mut sessions, table.id("801").unwrap(), 0, 5, 2);
        book_room(&mut grid, &mut sessions, table.id("802").unwrap(), 0, 5, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let streams = vec![stream("OS Lab"), stream("DBMS Lab"), stream("CN Lab")];
        assert!(alloc.lab_rooms(&grid, &mut rng, 0, 5, 2, &streams).is_none());
        // A block later in the day still fits.
        assert!(alloc.lab_rooms(&grid, &mut rng, 0, 7, 2, &streams).is_some());
        let two = vec![stream("OS Lab"), stream("Free")];
        assert!(alloc.lab_rooms(&grid, &mut rng, 0, 5, 2, &two).is_some());
    }

    #[test]
    fn test_tutorials_use_overflow_room() {
        let (alloc, table) = setup(&[]);
        let mut grid = Grid::new(layout(), 2, Vec::new(), table.len());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let maths = table.id("902").unwrap();
        assert_eq!(alloc.tutorial_room(&grid, &mut rng, 1, 6, 0), Some(maths));
        let mut sessions = Vec::new();
        book_room(&mut grid, &mut sessions, maths, 1, 6, 1);
        assert_eq!(alloc.tutorial_room(&grid, &mut rng, 1, 6, 0), None);
    }
}
