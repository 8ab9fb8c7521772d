//! Immutable run records
//!
//! A [`RunRecord`] owns the outcomes of one stage execution. Pass, fail and
//! skip counts are always derived from the outcomes; there is no way to
//! supply them independently.

use crate::types::{RunId, Stage, TestId, TestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One test's result within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    id: TestId,
    status: TestStatus,
    #[serde(with = "duration_ms")]
    duration: Duration,
    timestamp: DateTime<Utc>,
}

impl TestOutcome {
    /// Create outcome
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<TestId>,
        status: TestStatus,
        duration: Duration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            duration,
            timestamp,
        }
    }

    /// Test identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// Outcome status
    #[inline]
    #[must_use]
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Time the test took
    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the outcome was recorded
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the test failed
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::Failed
    }
}

/// One execution of a test stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    id: RunId,
    stage: Stage,
    outcomes: Vec<TestOutcome>,
    coverage: Option<f64>,
    #[serde(with = "duration_ms")]
    total_duration: Duration,
    started_at: DateTime<Utc>,
    partial: bool,
}

impl RunRecord {
    /// Create a record from outcomes.
    ///
    /// Total duration defaults to the sum of outcome durations and the start
    /// time to the earliest outcome timestamp (or now, for an empty run).
    #[must_use]
    pub fn new(stage: Stage, outcomes: Vec<TestOutcome>) -> Self {
        let total_duration = outcomes.iter().map(TestOutcome::duration).sum();
        let started_at = outcomes
            .iter()
            .map(TestOutcome::timestamp)
            .min()
            .unwrap_or_else(Utc::now);
        Self {
            id: RunId::new(),
            stage,
            outcomes,
            coverage: None,
            total_duration,
            started_at,
            partial: false,
        }
    }

    /// With measured coverage percentage
    #[inline]
    #[must_use]
    pub fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// With wall-clock duration of the whole stage
    #[inline]
    #[must_use]
    pub fn with_total_duration(mut self, total: Duration) -> Self {
        self.total_duration = total;
        self
    }

    /// With stage start time
    #[inline]
    #[must_use]
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Mark as a partial report from an aborted stage
    #[inline]
    #[must_use]
    pub fn mark_partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Run identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Stage that produced the run
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Outcomes in report order
    #[inline]
    #[must_use]
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    /// Coverage percentage, `None` when not measured
    #[inline]
    #[must_use]
    pub fn coverage(&self) -> Option<f64> {
        self.coverage
    }

    /// Wall-clock duration of the stage
    #[inline]
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Stage start time
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the stage was aborted before all tests completed
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Whether the run has no outcomes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Failed outcomes in report order
    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Counts derived from the outcomes
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Aggregate counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Passed outcomes
    pub passed: usize,
    /// Failed outcomes
    pub failed: usize,
    /// Skipped outcomes
    pub skipped: usize,
}

impl RunSummary {
    /// Total outcomes
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Serde helper storing a [`Duration`] as fractional milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize as milliseconds
    ///
    /// # Errors
    /// Propagates serializer errors
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (value.as_secs_f64() * 1000.0).serialize(serializer)
    }

    /// Deserialize from milliseconds
    ///
    /// # Errors
    /// Fails on negative or non-finite values
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(serde::de::Error::custom)
    }
}
