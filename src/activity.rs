//! Bounded, newest-first log of what the user did and what failed.
use super::types::TimeStamp;
use std::collections::VecDeque;

pub const ACTIVITY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub timestamp: TimeStamp,
    pub message: String,
}

#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "room_booking::activity", "{message}");

        self.entries.push_front(ActivityEntry {
            timestamp: TimeStamp::new(),
            message,
        });
        self.entries.truncate(self.capacity);
    }

    /// Failures are logged at warn level but kept in the same list.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "room_booking::activity", "{message}");

        self.entries.push_front(ActivityEntry {
            timestamp: TimeStamp::new(),
            message,
        });
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
