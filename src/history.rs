//! Bounded log of status transitions, newest first.

use crate::HistoryEntry;
use std::collections::VecDeque;

/// Entries kept before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 20;

/// Append-only record of interruptions. Index 0 is always the newest entry.
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Seed a log from previously persisted entries, newest first.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut log = Self::new();
        log.entries.extend(entries.into_iter().take(HISTORY_CAPACITY));
        log
    }

    /// Prepend `entry`, dropping anything past [`HISTORY_CAPACITY`].
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    /// Copy of the entries, newest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
