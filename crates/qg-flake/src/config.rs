//! Flake tracker configuration

use crate::error::TrackerConfigError;
use serde::{Deserialize, Serialize};

/// Window bounds for flake tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Most recent outcomes kept per test
    pub window_runs: usize,
    /// Outcomes older than this many days are evicted
    pub window_days: i64,
    /// Trailing period for the flake rate
    pub rate_days: i64,
}

impl TrackerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With window length in outcomes
    #[inline]
    #[must_use]
    pub fn with_window_runs(mut self, runs: usize) -> Self {
        self.window_runs = runs;
        self
    }

    /// With window age in days
    #[inline]
    #[must_use]
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    /// Window age bound
    #[must_use]
    pub fn window_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }

    /// Flake rate period
    #[must_use]
    pub fn rate_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.rate_days)
    }

    /// Check bounds
    ///
    /// # Errors
    /// Returns [`TrackerConfigError`] for an empty window or non-positive
    /// day counts.
    pub fn validate(&self) -> Result<(), TrackerConfigError> {
        if self.window_runs == 0 {
            return Err(TrackerConfigError::EmptyWindow);
        }
        for (field, value) in [("window_days", self.window_days), ("rate_days", self.rate_days)] {
            if value < 1 {
                return Err(TrackerConfigError::NonPositiveDays { field, value });
            }
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_runs: 20,
            window_days: 7,
            rate_days: 7,
        }
    }
}
