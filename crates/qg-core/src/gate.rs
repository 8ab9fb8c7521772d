//! Quality gate service
//!
//! Wires the three components together in the order a CI stage needs them:
//!
//! 1. ingest the raw report into a [`RunRecord`]
//! 2. record its outcomes in the flake tracker (skipped for dry runs)
//! 3. take a flake snapshot
//! 4. evaluate the run against the snapshot
//!
//! Recording completes before the snapshot is taken, so the verdict sees
//! the run's own effect on flake classification.

use crate::config::QualityGateConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use qg_eval::{GateConfig, GateEvaluator, Verdict};
use qg_flake::{
    FlakeRate, FlakeTracker, Quarantine, QuarantineRequest, TestHealth, TrackerState,
};
use qg_report::{ingest, ingest_json, RawReport, RunRecord, TestId};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

/// Whether a submission updates flake history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitMode {
    /// Record outcomes, then evaluate
    #[default]
    Record,
    /// Evaluate against existing history only
    DryRun,
}

/// Gate service owning the evaluator and a shared flake tracker
#[derive(Debug)]
pub struct QualityGate {
    evaluator: GateEvaluator,
    tracker: Arc<FlakeTracker>,
}

impl QualityGate {
    /// Create a service with a fresh tracker
    ///
    /// # Errors
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: &QualityGateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            evaluator: GateEvaluator::new(config.gate.clone()),
            tracker: Arc::new(FlakeTracker::new(config.tracker)),
        })
    }

    /// Create a service around an existing tracker
    ///
    /// # Errors
    /// Returns a configuration error if either configuration is invalid.
    pub fn with_tracker(gate: GateConfig, tracker: Arc<FlakeTracker>) -> Result<Self> {
        gate.validate()?;
        tracker.config().validate()?;
        Ok(Self {
            evaluator: GateEvaluator::new(gate),
            tracker,
        })
    }

    /// Gate thresholds
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        self.evaluator.config()
    }

    /// Shared flake tracker
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<FlakeTracker> {
        &self.tracker
    }

    /// Ingest and evaluate one raw report
    ///
    /// # Errors
    /// Returns [`crate::GateError::MalformedReport`] if the report is
    /// invalid. Nothing is recorded in that case.
    pub fn submit(&self, raw: RawReport, mode: SubmitMode) -> Result<Verdict> {
        let run = ingest(raw)?;
        Ok(self.process(&run, mode))
    }

    /// Ingest and evaluate one JSON report
    ///
    /// # Errors
    /// As [`Self::submit`].
    pub fn submit_json(&self, json: &str, mode: SubmitMode) -> Result<Verdict> {
        let run = ingest_json(json)?;
        Ok(self.process(&run, mode))
    }

    /// Record (unless dry run) and evaluate an ingested run
    #[must_use]
    pub fn process(&self, run: &RunRecord, mode: SubmitMode) -> Verdict {
        if mode == SubmitMode::Record {
            let _ = self.tracker.record(run);
        }
        let snapshot = self.tracker.snapshot();
        self.evaluator.evaluate(run, &snapshot)
    }

    /// Place a flaky test into quarantine
    ///
    /// # Errors
    /// Returns [`crate::GateError::Quarantine`] if the request is refused.
    pub fn quarantine(&self, request: &QuarantineRequest) -> Result<Quarantine> {
        Ok(self.tracker.quarantine(request)?)
    }

    /// Resolve a quarantine
    ///
    /// # Errors
    /// Returns [`crate::GateError::Quarantine`] if the test is not
    /// quarantined.
    pub fn release(&self, id: &TestId) -> Result<Quarantine> {
        Ok(self.tracker.release(id)?)
    }

    /// Expire every overdue quarantine, returning how many escalated
    pub fn sweep_expired(&self) -> usize {
        self.tracker.sweep_expired()
    }

    /// Replace tracker history with persisted state
    pub fn load_state(&self, state: TrackerState) {
        self.tracker.load(state);
    }

    /// Current tracker history
    #[must_use]
    pub fn export_state(&self) -> TrackerState {
        self.tracker.export()
    }

    /// Flake rate and per-test health
    #[must_use]
    pub fn status(&self) -> StatusReport {
        let mut tests: Vec<TestHealth> = self
            .tracker
            .tests()
            .iter()
            .filter_map(|id| self.tracker.inspect(id))
            .collect();
        tests.sort_by(|a, b| a.test_id.cmp(&b.test_id));

        let weekly = self.tracker.weekly_flake_stats();
        StatusReport {
            taken_at: self.tracker.now(),
            flake_rate: weekly.rate(),
            weekly,
            tests,
        }
    }
}

/// Tracker overview for the `status` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// When the report was produced
    pub taken_at: DateTime<Utc>,
    /// Weekly flake rate
    pub flake_rate: f64,
    /// Numerator and denominator of the rate
    pub weekly: FlakeRate,
    /// Every tracked test, by id
    pub tests: Vec<TestHealth>,
}

impl StatusReport {
    /// Human-readable table
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "weekly flake rate: {:.4} ({} of {} tests)",
            self.flake_rate, self.weekly.unreliable, self.weekly.observed
        );
        for health in &self.tests {
            let _ = write!(
                out,
                "  {:<12} {} (pass {}, fail {})",
                health.classification.as_str(),
                health.test_id,
                health.counts.passed,
                health.counts.failed
            );
            if health.regressed {
                out.push_str(" regressed");
            }
            if let Some(q) = &health.quarantine {
                let _ = write!(
                    out,
                    " owner={} ticket={} expires={}",
                    q.owner,
                    q.ticket,
                    q.expires_at.to_rfc3339()
                );
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use pretty_assertions::assert_eq;
    use qg_flake::{Classification, CollectingSink, ManualClock, TrackerConfig};
    use qg_report::{Stage, TestStatus};
    use qg_test_utils::{base_time, outcome, raw_report};

    fn gate_with_clock() -> (QualityGate, Arc<ManualClock>, Arc<CollectingSink>) {
        let clock = Arc::new(ManualClock::new(base_time()));
        let sink = Arc::new(CollectingSink::new());
        let tracker = FlakeTracker::new(TrackerConfig::default())
            .with_clock(clock.clone())
            .with_sink(sink.clone());
        let gate = QualityGate::with_tracker(GateConfig::default(), Arc::new(tracker)).unwrap();
        (gate, clock, sink)
    }

    fn single(id: &str, status: TestStatus, minutes: i64) -> RunRecord {
        let at = base_time() + chrono::Duration::minutes(minutes);
        RunRecord::new(Stage::Unit, vec![outcome(id, status, at)])
    }

    #[test]
    fn submit_records_before_evaluating() {
        let (gate, _, _) = gate_with_clock();
        let verdict = gate
            .submit(raw_report("unit", &["a", "b"]), SubmitMode::Record)
            .unwrap();

        assert!(verdict.pass());
        assert_eq!(gate.tracker().len(), 2);
    }

    #[test]
    fn dry_run_leaves_history_untouched() {
        let (gate, _, _) = gate_with_clock();
        gate.submit(raw_report("unit", &["a"]), SubmitMode::DryRun)
            .unwrap();
        assert!(gate.tracker().is_empty());
    }

    #[test]
    fn malformed_report_records_nothing() {
        let (gate, _, _) = gate_with_clock();
        let json = r#"{"stage": "unit", "outcomes": [{"id": "", "status": "passed"}]}"#;
        let err = gate.submit_json(json, SubmitMode::Record).unwrap_err();

        assert!(matches!(err, GateError::MalformedReport(_)));
        assert!(gate.tracker().is_empty());
    }

    #[test]
    fn run_that_makes_a_test_flaky_counts_toward_its_own_flake_rate() {
        let (gate, _, _) = gate_with_clock();
        let _ = gate.process(&single("net", TestStatus::Passed, 0), SubmitMode::Record);
        let verdict = gate.process(&single("net", TestStatus::Failed, 1), SubmitMode::Record);

        assert!(!verdict.pass());
        assert_eq!(
            verdict.reason_strings(),
            vec!["UNQUARANTINED_FAILURE: net", "FLAKE_RATE_EXCEEDED: 1 > 0.01"]
        );
    }

    #[test]
    fn quarantine_lifecycle_through_service() {
        let (gate, clock, sink) = gate_with_clock();
        let _ = gate.process(&single("net", TestStatus::Passed, 0), SubmitMode::Record);
        let _ = gate.process(&single("net", TestStatus::Failed, 1), SubmitMode::Record);

        let request = QuarantineRequest::new()
            .test("net")
            .owner("infra")
            .ticket("QA-7")
            .expires_at(base_time() + chrono::Duration::days(2));
        gate.quarantine(&request).unwrap();
        assert_eq!(gate.tracker().classify(&"net".into()), Classification::Quarantined);

        clock.advance(chrono::Duration::days(3));
        assert_eq!(gate.sweep_expired(), 1);
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            gate.release(&"net".into()).unwrap_err(),
            GateError::Quarantine(_)
        ));
    }

    #[test]
    fn status_lists_tests_in_order() {
        let (gate, _, _) = gate_with_clock();
        let _ = gate.process(&single("b", TestStatus::Passed, 0), SubmitMode::Record);
        let _ = gate.process(&single("a", TestStatus::Failed, 0), SubmitMode::Record);

        let status = gate.status();
        let ids: Vec<_> = status.tests.iter().map(|h| h.test_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(status.tests[0].regressed);
        assert_eq!(status.flake_rate, 0.0);
        assert!(status.render_text().contains("regressed"));
    }

    #[test]
    fn state_round_trips_through_service() {
        let (gate, _, _) = gate_with_clock();
        let _ = gate.process(&single("a", TestStatus::Passed, 0), SubmitMode::Record);
        let state = gate.export_state();

        let (restored, _, _) = gate_with_clock();
        restored.load_state(state.clone());
        assert_eq!(restored.export_state(), state);
    }
}
