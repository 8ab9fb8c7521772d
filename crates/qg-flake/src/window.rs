//! Bounded per-test outcome history

use chrono::{DateTime, Utc};
use qg_report::{RunId, TestStatus};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One remembered outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    /// Run that produced the outcome
    pub run: RunId,
    /// Outcome status
    pub status: TestStatus,
    /// Outcome timestamp
    pub timestamp: DateTime<Utc>,
}

/// Rolling window ordered by timestamp, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeWindow {
    entries: VecDeque<WindowEntry>,
}

/// Pass/fail/skip counts over a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounts {
    /// Passed outcomes
    pub passed: usize,
    /// Failed outcomes
    pub failed: usize,
    /// Skipped outcomes
    pub skipped: usize,
}

impl WindowCounts {
    /// Mixed passes and failures
    #[inline]
    #[must_use]
    pub fn is_flaky(&self) -> bool {
        self.passed > 0 && self.failed > 0
    }

    /// Only failures among decisive outcomes
    #[inline]
    #[must_use]
    pub fn is_regressed(&self) -> bool {
        self.failed > 0 && self.passed == 0
    }

    /// Fraction of decisive outcomes that failed
    #[must_use]
    pub fn failure_ratio(&self) -> Option<f64> {
        let decisive = self.passed + self.failed;
        if decisive == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            Some(self.failed as f64 / decisive as f64)
        }
    }
}

impl OutcomeWindow {
    /// Create empty window
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = WindowEntry>) -> Self {
        let mut window = Self::new();
        for entry in entries {
            window.push(entry);
        }
        window
    }

    /// Insert keeping timestamp order; equal timestamps keep arrival order
    pub fn push(&mut self, entry: WindowEntry) {
        let at = self
            .entries
            .partition_point(|e| e.timestamp <= entry.timestamp);
        self.entries.insert(at, entry);
    }

    /// Drop entries older than `cutoff`, then the oldest beyond `max_len`
    pub fn evict(&mut self, cutoff: DateTime<Utc>, max_len: usize) -> usize {
        let before = self.entries.len();
        while self.entries.front().is_some_and(|e| e.timestamp < cutoff) {
            self.entries.pop_front();
        }
        while self.entries.len() > max_len {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }

    /// Counts over the whole window
    #[must_use]
    pub fn counts(&self) -> WindowCounts {
        let mut counts = WindowCounts::default();
        for entry in &self.entries {
            match entry.status {
                TestStatus::Passed => counts.passed += 1,
                TestStatus::Failed => counts.failed += 1,
                TestStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Whether any outcome falls at or after `since`
    #[must_use]
    pub fn observed_since(&self, since: DateTime<Utc>) -> bool {
        self.entries.back().is_some_and(|e| e.timestamp >= since)
    }

    /// Most recent outcome time
    #[must_use]
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.entries.back().map(|e| e.timestamp)
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &WindowEntry> {
        self.entries.iter()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
