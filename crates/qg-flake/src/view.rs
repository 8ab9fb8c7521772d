//! Read-only classification views consumed by the gate evaluator.

use crate::lifecycle::Classification;
use chrono::{DateTime, Utc};
use qg_report::TestId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read contract of the flake tracker
pub trait FlakeClassificationView {
    /// Current classification of a test; unknown tests are stable
    fn classification(&self, id: &TestId) -> Classification;

    /// Fraction of tests observed in the trailing week that are unreliable
    fn weekly_flake_rate(&self) -> f64;

    /// Whether a test is currently quarantined
    fn is_quarantined(&self, id: &TestId) -> bool {
        self.classification(id) == Classification::Quarantined
    }
}

/// Flake rate numerator and denominator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakeRate {
    /// Tests observed this week that are flaky or quarantined
    pub unreliable: usize,
    /// Distinct tests observed this week
    pub observed: usize,
}

impl FlakeRate {
    /// Ratio, `0.0` when nothing was observed
    #[must_use]
    pub fn rate(&self) -> f64 {
        if self.observed == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.unreliable as f64 / self.observed as f64;
            rate
        }
    }
}

/// Point-in-time copy of every classification
///
/// Evaluating against a snapshot keeps verdicts reproducible while the
/// tracker keeps changing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlakeSnapshot {
    /// Classification per known test
    pub classifications: BTreeMap<TestId, Classification>,
    /// Weekly flake rate at snapshot time
    pub weekly: FlakeRate,
    /// When the snapshot was taken
    pub taken_at: Option<DateTime<Utc>>,
}

impl FlakeSnapshot {
    /// Snapshot with no history
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tests with the given classification
    pub fn with_classification(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &TestId> {
        self.classifications
            .iter()
            .filter(move |(_, c)| **c == classification)
            .map(|(id, _)| id)
    }
}

impl FlakeClassificationView for FlakeSnapshot {
    fn classification(&self, id: &TestId) -> Classification {
        self.classifications
            .get(id)
            .copied()
            .unwrap_or(Classification::Stable)
    }

    fn weekly_flake_rate(&self) -> f64 {
        self.weekly.rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tests_are_stable() {
        let snapshot = FlakeSnapshot::empty();
        assert_eq!(
            snapshot.classification(&TestId::new("missing")),
            Classification::Stable
        );
        assert_eq!(snapshot.weekly_flake_rate(), 0.0);
    }

    #[test]
    fn rate_divides_by_observed() {
        let rate = FlakeRate {
            unreliable: 3,
            observed: 100,
        };
        assert!((rate.rate() - 0.03).abs() < f64::EPSILON);
    }
}
