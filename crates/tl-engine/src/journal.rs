//! Bounded system event journal.
//!
//! A ticker-tape of recent engine happenings (replay started, anomaly
//! captured, table rebuilt) for status consumers. Keeps the most recent 50
//! entries and exposes the last 20; it is informational only and never
//! feeds back into engine state.

use crate::window::ReplayWindow;
use serde::{Deserialize, Serialize};

const JOURNAL_CAPACITY: usize = 50;
const JOURNAL_VISIBLE: usize = 20;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Wall-clock time of day, `HH:MM:SS`.
    pub time: String,
    /// Entry kind: "system", "replay", "anomaly", "highlight".
    pub kind: String,
    pub message: String,
}

/// Bounded journal of recent system events.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: ReplayWindow<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            entries: ReplayWindow::with_capacity(JOURNAL_CAPACITY),
        }
    }

    pub fn push(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.entries.push(JournalEntry {
            time: chrono::Utc::now().format("%H:%M:%S").to_string(),
            kind: kind.into(),
            message: message.into(),
        });
    }

    /// The most recent entries, oldest first, capped at 20.
    pub fn recent(&self) -> Vec<JournalEntry> {
        let skip = self.entries.len().saturating_sub(JOURNAL_VISIBLE);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_caps_at_twenty() {
        let mut j = Journal::new();
        for i in 0..30 {
            j.push("system", format!("event {i}"));
        }
        let recent = j.recent();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent.last().unwrap().message, "event 29");
        assert_eq!(recent.first().unwrap().message, "event 10");
    }

    #[test]
    fn test_journal_is_bounded() {
        let mut j = Journal::new();
        for i in 0..200 {
            j.push("anomaly", format!("event {i}"));
        }
        assert_eq!(j.len(), 50);
    }
}
