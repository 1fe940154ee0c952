//! Branching snapshot log for rewind and fast-forward.
//!
//! The log is an ordered sequence of snapshots with a cursor. Moving the
//! cursor never discards entries; recording after a rewind truncates
//! everything past the cursor before appending, the same branch-on-write
//! discipline as linear undo/redo.

use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};

/// One recorded point in the machine's timeline.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub snapshot: Snapshot,
    /// Wall-clock time the entry was recorded; diagnostic only, not part
    /// of the persisted snapshot form.
    pub recorded_at: DateTime<Utc>,
}

/// Appendable, truncate-on-branch snapshot log.
///
/// Invariant: once non-empty, `cursor` stays within `0..entries.len()`.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<LogEntry>,
    cursor: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot at the position after the cursor, discarding any
    /// later entries, and advance the cursor onto it.
    pub fn record(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(LogEntry {
            snapshot,
            recorded_at: Utc::now(),
        });
        self.cursor = self.entries.len() - 1;
    }

    /// Move the cursor back by `n`, clamped at the oldest entry, and
    /// return the entry now under it. `None` only when the log is empty.
    pub fn rewind(&mut self, n: usize) -> Option<&LogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(n);
        self.entries.get(self.cursor)
    }

    /// Move the cursor forward by `n`, clamped at the newest entry, and
    /// return the entry now under it.
    pub fn fast_forward(&mut self, n: usize) -> Option<&LogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + n).min(self.entries.len() - 1);
        self.entries.get(self.cursor)
    }

    /// Current cursor position.
    pub fn index(&self) -> usize {
        self.cursor
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
