//! The historical event log.
//!
//! Subsystems append notable transitions (task failures, mission phase
//! changes, malfunctions, clock lifecycle) as immutable records. The log
//! is bounded in memory -- oldest entries are dropped past the cap -- and
//! is persisted as one of the save stream's sections.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ids::EventId;
use crate::time::SimTime;

/// Default in-memory entry cap.
const DEFAULT_CAP: usize = 1024;

/// Which subsystem produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    /// Agent task lifecycle.
    Task,
    /// Mission lifecycle.
    Mission,
    /// Facility wear and repair.
    Facility,
    /// Exterior environment changes.
    Environment,
    /// Clock and persistence lifecycle.
    Clock,
}

/// One immutable event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// Simulated time at which the event occurred.
    pub at: SimTime,
    /// Pulse number during which the event occurred.
    pub pulse: u64,
    /// Producing subsystem.
    pub category: EventCategory,
    /// Human-readable description.
    pub description: String,
}

/// Bounded, append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    /// Records, oldest first.
    entries: VecDeque<HistoricalEvent>,
    /// Maximum retained entries.
    cap: usize,
}

impl EventLog {
    /// Create a log retaining up to `cap` entries.
    pub const fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
        }
    }

    /// Append a record, evicting the oldest past the cap.
    pub fn record(
        &mut self,
        at: SimTime,
        pulse: u64,
        category: EventCategory,
        description: impl Into<String>,
    ) {
        self.entries.push_back(HistoricalEvent {
            id: EventId::new(),
            at,
            pulse,
            category,
            description: description.into(),
        });
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    /// Iterate records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoricalEvent> {
        self.entries.iter()
    }

    /// The most recent record, if any.
    pub fn latest(&self) -> Option<&HistoricalEvent> {
        self.entries.back()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_cap(DEFAULT_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_in_order() {
        let mut log = EventLog::default();
        log.record(SimTime::from_whole(1), 1, EventCategory::Task, "first");
        log.record(SimTime::from_whole(2), 2, EventCategory::Mission, "second");
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().map(|e| e.description.as_str()), Some("second"));
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut log = EventLog::with_cap(2);
        log.record(SimTime::from_whole(1), 1, EventCategory::Clock, "a");
        log.record(SimTime::from_whole(2), 2, EventCategory::Clock, "b");
        log.record(SimTime::from_whole(3), 3, EventCategory::Clock, "c");
        assert_eq!(log.len(), 2);
        let first = log.iter().next().map(|e| e.description.clone());
        assert_eq!(first.as_deref(), Some("b"));
    }
}
