//! Gate Evaluator
//!
//! Applies the gate rules to a run in fixed order:
//!
//! 1. structural (`EMPTY_RUN`, short-circuits)
//! 2. failures (`UNQUARANTINED_FAILURE` / advisory `QUARANTINED_FAILURE`)
//! 3. coverage floor
//! 4. duration ceiling (advisory unless the stage says otherwise)
//! 5. weekly flake rate
//!
//! Evaluation is a pure function of its inputs and never fails: a failing
//! verdict is a successful evaluation.

use crate::config::GateConfig;
use crate::reason::Reason;
use crate::verdict::Verdict;
use qg_flake::FlakeClassificationView;
use qg_report::RunRecord;

/// Evaluate `run` against `config` and a flake view
#[must_use]
pub fn evaluate<V>(run: &RunRecord, config: &GateConfig, flakes: &V) -> Verdict
where
    V: FlakeClassificationView + ?Sized,
{
    let policy = config.policy(run.stage());

    if run.is_empty() && !policy.allow_empty {
        tracing::info!(run = %run.id(), stage = %run.stage(), "Empty run rejected");
        return Verdict::new(run.clone(), vec![Reason::EmptyRun]);
    }

    let mut reasons = Vec::new();

    for failure in run.failures() {
        let test_id = failure.id().clone();
        if flakes.is_quarantined(&test_id) {
            reasons.push(Reason::QuarantinedFailure { test_id });
        } else {
            reasons.push(Reason::UnquarantinedFailure { test_id });
        }
    }

    if let Some(actual) = run.coverage() {
        if actual < config.min_coverage {
            reasons.push(Reason::CoverageBelowThreshold {
                actual,
                min: config.min_coverage,
            });
        }
    }

    if let Some(max) = policy.max_duration {
        if run.total_duration() > max {
            reasons.push(Reason::DurationExceeded {
                actual: run.total_duration(),
                max,
                blocking: policy.duration_blocking,
            });
        }
    }

    let rate = flakes.weekly_flake_rate();
    if rate > config.max_flake_rate {
        reasons.push(Reason::FlakeRateExceeded {
            actual: rate,
            max: config.max_flake_rate,
        });
    }

    let verdict = Verdict::new(run.clone(), reasons);
    tracing::info!(
        run = %run.id(),
        stage = %run.stage(),
        pass = verdict.pass(),
        blocking = verdict.blocking_reasons().count(),
        advisories = verdict.advisories().count(),
        "Gate evaluated"
    );
    verdict
}

/// Evaluator bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct GateEvaluator {
    config: GateConfig,
}

impl GateEvaluator {
    /// Create evaluator
    #[inline]
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate a run against a flake view
    #[must_use]
    pub fn evaluate<V>(&self, run: &RunRecord, flakes: &V) -> Verdict
    where
        V: FlakeClassificationView + ?Sized,
    {
        evaluate(run, &self.config, flakes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qg_flake::{Classification, FlakeRate, FlakeSnapshot};
    use qg_report::{Stage, TestId};
    use qg_test_utils::{failed, run_with, unit_run};
    use std::time::Duration;

    fn config() -> GateConfig {
        GateConfig::new()
            .with_min_coverage(80.0)
            .with_max_duration(Stage::Unit, Duration::from_secs(600))
    }

    fn quarantined(id: &str) -> FlakeSnapshot {
        let mut snapshot = FlakeSnapshot::empty();
        snapshot
            .classifications
            .insert(TestId::new(id), Classification::Quarantined);
        snapshot
    }

    #[test]
    fn clean_run_passes_without_reasons() {
        let verdict = evaluate(&unit_run(50, 85.0, 120), &config(), &FlakeSnapshot::empty());
        assert!(verdict.pass());
        assert!(verdict.reasons().is_empty());
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn low_coverage_blocks() {
        let verdict = evaluate(&unit_run(50, 72.0, 120), &config(), &FlakeSnapshot::empty());
        assert!(!verdict.pass());
        assert_eq!(verdict.reason_strings(), vec!["COVERAGE_BELOW_THRESHOLD: 72 < 80"]);
    }

    #[test]
    fn coverage_at_threshold_passes() {
        let verdict = evaluate(&unit_run(5, 80.0, 1), &config(), &FlakeSnapshot::empty());
        assert!(verdict.pass());
    }

    #[test]
    fn unmeasured_coverage_is_neither_pass_nor_fail() {
        let run = run_with(Stage::Unit, 10, Vec::new());
        let verdict = evaluate(&run, &config(), &FlakeSnapshot::empty());
        assert!(verdict.pass());
        assert!(verdict.reasons().is_empty());
    }

    #[test]
    fn empty_run_short_circuits() {
        let run = run_with(Stage::Unit, 0, Vec::new());
        let snapshot = FlakeSnapshot {
            weekly: FlakeRate {
                unreliable: 5,
                observed: 10,
            },
            ..FlakeSnapshot::empty()
        };
        let verdict = evaluate(&run, &config(), &snapshot);
        assert!(!verdict.pass());
        assert_eq!(verdict.reasons(), &[Reason::EmptyRun]);
    }

    #[test]
    fn empty_nightly_run_is_allowed() {
        let run = run_with(Stage::Nightly, 0, Vec::new());
        let verdict = evaluate(&run, &config(), &FlakeSnapshot::empty());
        assert!(verdict.pass());
    }

    #[test]
    fn each_unquarantined_failure_is_reported() {
        let run = run_with(
            Stage::Unit,
            10,
            vec![failed("test_x"), failed("test_y"), failed("test_x")],
        );
        let verdict = evaluate(&run, &config(), &FlakeSnapshot::empty());
        assert!(!verdict.pass());
        assert_eq!(
            verdict.reason_strings(),
            vec![
                "UNQUARANTINED_FAILURE: test_x",
                "UNQUARANTINED_FAILURE: test_y",
                "UNQUARANTINED_FAILURE: test_x",
            ]
        );
    }

    #[test]
    fn quarantined_failure_is_advisory() {
        let run = run_with(Stage::Unit, 49, vec![failed("test_x")])
            .with_coverage(85.0)
            .with_total_duration(Duration::from_secs(120));
        let verdict = evaluate(&run, &config(), &quarantined("test_x"));
        assert!(verdict.pass());
        assert_eq!(verdict.reason_strings(), vec!["QUARANTINED_FAILURE: test_x"]);
        assert_eq!(verdict.advisories().count(), 1);
    }

    #[test]
    fn duration_breach_is_advisory_by_default() {
        let verdict = evaluate(&unit_run(10, 90.0, 700), &config(), &FlakeSnapshot::empty());
        assert!(verdict.pass());
        assert_eq!(verdict.reason_strings(), vec!["DURATION_EXCEEDED: 700s > 600s"]);
    }

    #[test]
    fn duration_breach_blocks_when_configured() {
        let config = config().with_duration_blocking(Stage::Unit, true);
        let verdict = evaluate(&unit_run(10, 90.0, 700), &config, &FlakeSnapshot::empty());
        assert!(!verdict.pass());
    }

    #[test]
    fn flake_rate_above_ceiling_blocks() {
        let snapshot = FlakeSnapshot {
            weekly: FlakeRate {
                unreliable: 3,
                observed: 100,
            },
            ..FlakeSnapshot::empty()
        };
        let verdict = evaluate(&unit_run(10, 90.0, 60), &config(), &snapshot);
        assert!(!verdict.pass());
        assert_eq!(verdict.reasons()[0].code(), "FLAKE_RATE_EXCEEDED");
    }

    #[test]
    fn all_violations_are_reported_in_rule_order() {
        let run = run_with(Stage::Unit, 3, vec![failed("a")])
            .with_coverage(10.0)
            .with_total_duration(Duration::from_secs(601));
        let snapshot = FlakeSnapshot {
            weekly: FlakeRate {
                unreliable: 1,
                observed: 2,
            },
            ..FlakeSnapshot::empty()
        };
        let codes: Vec<_> = evaluate(&run, &config(), &snapshot)
            .reasons()
            .iter()
            .map(Reason::code)
            .collect();
        assert_eq!(
            codes,
            vec![
                "UNQUARANTINED_FAILURE",
                "COVERAGE_BELOW_THRESHOLD",
                "DURATION_EXCEEDED",
                "FLAKE_RATE_EXCEEDED",
            ]
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let run = run_with(Stage::Unit, 20, vec![failed("test_x")]).with_coverage(75.0);
        let evaluator = GateEvaluator::new(config());
        let snapshot = FlakeSnapshot::empty();
        assert_eq!(evaluator.evaluate(&run, &snapshot), evaluator.evaluate(&run, &snapshot));
    }

    #[test]
    fn verdict_report_splits_reasons() {
        let run = run_with(Stage::Unit, 5, vec![failed("a"), failed("q")]);
        let verdict = evaluate(&run, &config(), &quarantined("q"));
        let report = verdict.report();
        assert!(!report.pass);
        assert_eq!(report.blocking, vec!["UNQUARANTINED_FAILURE: a"]);
        assert_eq!(report.advisories, vec!["QUARANTINED_FAILURE: q"]);
        assert_eq!(report.summary.failed, 2);
        assert!(verdict.render_text().contains("[x] UNQUARANTINED_FAILURE: a"));
    }
}
