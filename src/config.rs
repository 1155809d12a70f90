use std::env;
use std::net::SocketAddr;

use crate::data::TimingConfig;
use crate::model::{DayIndex, SlotIndex};

/// Validated shape of a teaching week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayLayout {
    pub days: Vec<String>,
    pub slots_per_day: usize,
    pub recess: SlotIndex,
}

impl DayLayout {
    pub const MAX_DAYS: usize = 7;
    pub const MAX_SLOTS_PER_DAY: usize = 24;

    pub fn from_config(config: &TimingConfig) -> Result<Self, String> {
        if config.days.is_empty() {
            return Err("config.days must name at least one day".to_string());
        }
        if config.days.len() > Self::MAX_DAYS {
            return Err(format!("config.days names more than {} days", Self::MAX_DAYS));
        }
        if config.slots_per_day == 0 {
            return Err("config.slots_per_day must be positive".to_string());
        }
        if config.slots_per_day > Self::MAX_SLOTS_PER_DAY {
            return Err(format!(
                "config.slots_per_day {} is above the limit of {}",
                config.slots_per_day,
                Self::MAX_SLOTS_PER_DAY
            ));
        }
        if config.recess_index >= config.slots_per_day {
            return Err(format!(
                "config.recess_index {} is outside a {}-slot day",
                config.recess_index, config.slots_per_day
            ));
        }
        Ok(Self {
            days: config.days.clone(),
            slots_per_day: config.slots_per_day,
            recess: config.recess_index,
        })
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn day_index(&self, name: &str) -> Option<DayIndex> {
        self.days.iter().position(|d| d == name)
    }

    pub fn last_slot(&self) -> SlotIndex {
        self.slots_per_day - 1
    }

    pub fn is_teaching_slot(&self, slot: SlotIndex) -> bool {
        slot < self.slots_per_day && slot != self.recess
    }

    pub fn is_before_recess(&self, slot: SlotIndex) -> bool {
        slot < self.recess
    }

    /// The teaching slot right before `slot`, stepping over recess.
    pub fn prev_teaching(&self, slot: SlotIndex) -> Option<SlotIndex> {
        let mut prev = slot.checked_sub(1)?;
        if prev == self.recess {
            prev = prev.checked_sub(1)?;
        }
        Some(prev)
    }

    /// The teaching slot right after `slot`, stepping over recess.
    pub fn next_teaching(&self, slot: SlotIndex) -> Option<SlotIndex> {
        let mut next = slot + 1;
        if next == self.recess {
            next += 1;
        }
        (next < self.slots_per_day).then_some(next)
    }

    /// Whether `[start, start + duration)` fits in the day without touching recess.
    pub fn block_fits(&self, start: SlotIndex, duration: usize) -> bool {
        (start..start + duration).all(|s| self.is_teaching_slot(s))
    }

    /// Start offsets tried for two-slot lab blocks, best first.
    pub fn lab_starts(&self, has_library: bool) -> Vec<SlotIndex> {
        let last = self.last_slot();
        let after_recess = self.recess + 1;
        let preferred: Vec<Option<SlotIndex>> = if has_library {
            vec![
                Some(0),
                last.checked_sub(1),
                Some(1),
                last.checked_sub(2),
                Some(after_recess),
                Some(2),
            ]
        } else {
            vec![Some(after_recess), last.checked_sub(1), Some(0), Some(2)]
        };
        let mut starts = Vec::new();
        for start in preferred.into_iter().flatten() {
            if self.block_fits(start, 2) && !starts.contains(&start) {
                starts.push(start);
            }
        }
        starts
    }

    /// Candidate slots for one-slot sessions: the anchors after recess and at
    /// the start of the day first, then the rest in order.
    pub fn lecture_slots(&self) -> Vec<SlotIndex> {
        let anchors = [self.recess + 1, 0];
        let mut slots: Vec<SlotIndex> = anchors
            .into_iter()
            .filter(|&s| self.is_teaching_slot(s))
            .collect();
        slots.extend((0..self.slots_per_day).filter(|s| self.is_teaching_slot(*s) && !anchors.contains(s)));
        slots
    }
}

/// Settings for the HTTP service, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub max_concurrent_solves: usize,
}

impl ServerConfig {
    pub const DEFAULT_ADDR: &'static str = "127.0.0.1:8080";
    pub const DEFAULT_MAX_CONCURRENT_SOLVES: usize = 4;

    pub fn from_env() -> Result<Self, String> {
        let addr = env::var("TIMETABLE_ADDR").unwrap_or_else(|_| Self::DEFAULT_ADDR.to_string());
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid TIMETABLE_ADDR {addr:?}: {e}"))?;
        let max_concurrent_solves = match env::var("TIMETABLE_MAX_CONCURRENT_SOLVES") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("invalid TIMETABLE_MAX_CONCURRENT_SOLVES {raw:?}"))?,
            Err(_) => Self::DEFAULT_MAX_CONCURRENT_SOLVES,
        };
        Ok(Self {
            addr,
            max_concurrent_solves,
        })
    }
}
