//! Run Ingestor
//!
//! Turns a raw stage report into an immutable [`RunRecord`]. Everything
//! downstream trusts the record, so all validation happens here. Ingesting
//! has no side effects, which keeps replays and dry runs harmless.

use crate::error::MalformedReportError;
use crate::record::{RunRecord, TestOutcome};
use crate::types::{Stage, TestId, TestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Report as sent by a CI stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    /// Stage name (unit, integration, e2e, nightly)
    pub stage: String,
    /// Outcomes in execution order
    #[serde(default)]
    pub outcomes: Vec<RawOutcome>,
    /// Coverage percentage, absent when not measured
    #[serde(default)]
    pub coverage: Option<f64>,
    /// Wall-clock duration of the stage in milliseconds
    #[serde(default)]
    pub total_duration_ms: Option<f64>,
    /// Stage start time
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Stage ran but executed no tests
    #[serde(default)]
    pub empty: bool,
    /// Stage was aborted; outcomes cover only completed tests
    #[serde(default)]
    pub partial: bool,
}

/// One outcome as sent by a CI stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOutcome {
    /// Test identifier
    #[serde(default)]
    pub id: String,
    /// Status name
    #[serde(default)]
    pub status: String,
    /// Duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// When the test finished
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawReport {
    /// Create report for a stage
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    /// Add an outcome
    #[must_use]
    pub fn with_outcome(mut self, outcome: RawOutcome) -> Self {
        self.outcomes.push(outcome);
        self
    }

    /// With coverage percentage
    #[must_use]
    pub fn with_coverage(mut self, coverage: f64) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Decode a JSON report without validating it
    ///
    /// # Errors
    /// Returns [`MalformedReportError::Decode`] on invalid JSON
    pub fn from_json(json: &str) -> Result<Self, MalformedReportError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RawOutcome {
    /// Create outcome
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        status: impl Into<String>,
        duration_ms: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            duration_ms: Some(duration_ms),
            timestamp: Some(timestamp),
        }
    }
}

/// Validate a raw report and build its run record
///
/// # Errors
/// Returns [`MalformedReportError`] naming the offending field or outcome
/// index when the report is structurally invalid.
pub fn ingest(raw: RawReport) -> Result<RunRecord, MalformedReportError> {
    let stage: Stage = raw.stage.parse()?;

    if raw.outcomes.is_empty() && !raw.empty && !raw.partial {
        return Err(MalformedReportError::NoOutcomes);
    }
    if raw.empty && !raw.outcomes.is_empty() {
        return Err(MalformedReportError::EmptyFlagWithOutcomes {
            count: raw.outcomes.len(),
        });
    }

    let outcomes = raw
        .outcomes
        .iter()
        .enumerate()
        .map(|(index, outcome)| validate_outcome(index, outcome))
        .collect::<Result<Vec<_>, _>>()?;

    let coverage = match raw.coverage {
        Some(c) if !c.is_finite() || !(0.0..=100.0).contains(&c) => {
            return Err(MalformedReportError::CoverageOutOfRange { coverage: c });
        }
        // An empty stage measured nothing
        Some(_) if outcomes.is_empty() => None,
        other => other,
    };

    let mut record = RunRecord::new(stage, outcomes);
    if let Some(ms) = raw.total_duration_ms {
        let total = millis(ms)
            .ok_or(MalformedReportError::InvalidTotalDuration { duration_ms: ms })?;
        record = record.with_total_duration(total);
    }
    if let Some(started_at) = raw.started_at {
        record = record.with_started_at(started_at);
    }
    if let Some(coverage) = coverage {
        record = record.with_coverage(coverage);
    }
    if raw.partial {
        record = record.mark_partial();
    }

    tracing::debug!(
        run = %record.id(),
        stage = %stage,
        outcomes = record.outcomes().len(),
        partial = record.is_partial(),
        "Ingested run report"
    );

    Ok(record)
}

/// Decode and ingest a JSON report
///
/// # Errors
/// Returns [`MalformedReportError::Decode`] for invalid JSON and any
/// validation error from [`ingest`].
pub fn ingest_json(json: &str) -> Result<RunRecord, MalformedReportError> {
    ingest(RawReport::from_json(json)?)
}

fn validate_outcome(index: usize, raw: &RawOutcome) -> Result<TestOutcome, MalformedReportError> {
    let id = raw.id.trim();
    if id.is_empty() {
        return Err(MalformedReportError::EmptyTestId { index });
    }

    let status: TestStatus = raw
        .status
        .parse()
        .map_err(|_| MalformedReportError::UnknownStatus {
            index,
            status: raw.status.clone(),
        })?;

    let duration_ms = raw.duration_ms.ok_or(MalformedReportError::MissingField {
        index,
        field: "duration_ms",
    })?;
    let duration = millis(duration_ms)
        .ok_or(MalformedReportError::InvalidOutcomeDuration { index, duration_ms })?;

    let timestamp = raw.timestamp.ok_or(MalformedReportError::MissingField {
        index,
        field: "timestamp",
    })?;

    Ok(TestOutcome::new(TestId::new(id), status, duration, timestamp))
}

fn millis(ms: f64) -> Option<Duration> {
    if ms.is_finite() && ms >= 0.0 {
        Duration::try_from_secs_f64(ms / 1000.0).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn passing(id: &str) -> RawOutcome {
        RawOutcome::new(id, "passed", 12.5, ts())
    }

    #[test]
    fn ingest_builds_record() {
        let raw = RawReport::new("unit")
            .with_outcome(passing("a"))
            .with_outcome(RawOutcome::new("b", "failed", 3.0, ts()))
            .with_coverage(85.0);

        let run = ingest(raw).unwrap();
        assert_eq!(run.stage(), Stage::Unit);
        assert_eq!(run.outcomes().len(), 2);
        assert_eq!(run.coverage(), Some(85.0));
        assert_eq!(run.summary().failed, 1);
        assert_eq!(run.outcomes()[0].duration(), Duration::from_micros(12_500));
    }

    #[test]
    fn ingest_rejects_unknown_stage() {
        let err = ingest(RawReport::new("smoke").with_outcome(passing("a"))).unwrap_err();
        assert_eq!(
            err,
            MalformedReportError::UnknownStage {
                stage: "smoke".to_string()
            }
        );
    }

    #[test]
    fn ingest_requires_outcomes_or_empty_flag() {
        let err = ingest(RawReport::new("unit")).unwrap_err();
        assert_eq!(err, MalformedReportError::NoOutcomes);

        let mut empty = RawReport::new("unit").with_coverage(90.0);
        empty.empty = true;
        let run = ingest(empty).unwrap();
        assert!(run.is_empty());
        assert_eq!(run.coverage(), None);
    }

    #[test]
    fn ingest_rejects_empty_flag_with_outcomes() {
        let mut raw = RawReport::new("unit").with_outcome(passing("a"));
        raw.empty = true;
        assert_eq!(
            ingest(raw).unwrap_err(),
            MalformedReportError::EmptyFlagWithOutcomes { count: 1 }
        );
    }

    #[test]
    fn ingest_accepts_partial_report_without_outcomes() {
        let mut raw = RawReport::new("e2e");
        raw.partial = true;
        let run = ingest(raw).unwrap();
        assert!(run.is_partial());
        assert!(run.is_empty());
    }

    #[test]
    fn ingest_reports_offending_outcome_index() {
        let raw = RawReport::new("unit")
            .with_outcome(passing("a"))
            .with_outcome(passing("b"))
            .with_outcome(RawOutcome::new("  ", "passed", 1.0, ts()));
        assert_eq!(
            ingest(raw).unwrap_err(),
            MalformedReportError::EmptyTestId { index: 2 }
        );

        let raw = RawReport::new("unit")
            .with_outcome(passing("a"))
            .with_outcome(RawOutcome::new("b", "errored", 1.0, ts()));
        assert_eq!(ingest(raw).unwrap_err().outcome_index(), Some(1));

        let raw = RawReport::new("unit").with_outcome(RawOutcome::new("a", "passed", -1.0, ts()));
        assert!(matches!(
            ingest(raw).unwrap_err(),
            MalformedReportError::InvalidOutcomeDuration { index: 0, .. }
        ));
    }

    #[test]
    fn ingest_rejects_missing_timestamp() {
        let mut outcome = passing("a");
        outcome.timestamp = None;
        assert_eq!(
            ingest(RawReport::new("unit").with_outcome(outcome)).unwrap_err(),
            MalformedReportError::MissingField {
                index: 0,
                field: "timestamp"
            }
        );
    }

    #[test]
    fn ingest_rejects_coverage_out_of_range() {
        let raw = RawReport::new("unit")
            .with_outcome(passing("a"))
            .with_coverage(120.0);
        assert!(matches!(
            ingest(raw).unwrap_err(),
            MalformedReportError::CoverageOutOfRange { .. }
        ));
    }

    #[test]
    fn ingest_uses_reported_total_duration() {
        let mut raw = RawReport::new("unit").with_outcome(passing("a"));
        raw.total_duration_ms = Some(120_000.0);
        let run = ingest(raw).unwrap();
        assert_eq!(run.total_duration(), Duration::from_secs(120));

        let mut raw = RawReport::new("unit").with_outcome(passing("a"));
        raw.total_duration_ms = Some(-5.0);
        assert!(matches!(
            ingest(raw).unwrap_err(),
            MalformedReportError::InvalidTotalDuration { .. }
        ));
    }

    #[test]
    fn ingest_json_decodes_report() {
        let json = r#"{
            "stage": "integration",
            "coverage": 81.5,
            "total_duration_ms": 4000,
            "outcomes": [
                {"id": "db::migrate", "status": "passed", "duration_ms": 1200, "timestamp": "2026-03-02T10:00:00Z"},
                {"id": "db::rollback", "status": "skipped", "duration_ms": 0, "timestamp": "2026-03-02T10:00:01Z"}
            ]
        }"#;
        let run = ingest_json(json).unwrap();
        assert_eq!(run.stage(), Stage::Integration);
        assert_eq!(run.summary().skipped, 1);
        assert_eq!(run.total_duration(), Duration::from_secs(4));
    }

    #[test]
    fn ingest_json_reports_decode_errors() {
        assert!(matches!(
            ingest_json("{not json").unwrap_err(),
            MalformedReportError::Decode { .. }
        ));
    }
}
