//! Testing utilities for the quality gate workspace
//!
//! Shared run and report fixtures.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use qg_report::{RawOutcome, RawReport, RunRecord, Stage, TestOutcome, TestStatus};
use std::time::Duration;

/// Fixed reference instant used by fixtures
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
}

pub fn outcome(id: &str, status: TestStatus, at: DateTime<Utc>) -> TestOutcome {
    TestOutcome::new(id, status, Duration::from_millis(25), at)
}

pub fn passed(id: &str) -> TestOutcome {
    outcome(id, TestStatus::Passed, base_time())
}

pub fn failed(id: &str) -> TestOutcome {
    outcome(id, TestStatus::Failed, base_time())
}

/// `count` passing outcomes named `test_0 .. test_{count-1}`
pub fn passing_outcomes(count: usize) -> Vec<TestOutcome> {
    (0..count).map(|i| passed(&format!("test_{i}"))).collect()
}

/// Run with `count` passing outcomes plus the given extra outcomes
pub fn run_with(stage: Stage, count: usize, extra: Vec<TestOutcome>) -> RunRecord {
    let mut outcomes = passing_outcomes(count);
    outcomes.extend(extra);
    RunRecord::new(stage, outcomes)
}

/// Unit run of `count` passing tests with coverage and total duration
pub fn unit_run(count: usize, coverage: f64, total_secs: u64) -> RunRecord {
    run_with(Stage::Unit, count, Vec::new())
        .with_coverage(coverage)
        .with_total_duration(Duration::from_secs(total_secs))
}

/// Raw report for `stage` with passing outcomes `ids`
pub fn raw_report(stage: &str, ids: &[&str]) -> RawReport {
    ids.iter().fold(RawReport::new(stage), |report, id| {
        report.with_outcome(RawOutcome::new(*id, "passed", 10.0, base_time()))
    })
}

/// JSON text of a raw report
pub fn raw_report_json(stage: &str, ids: &[&str], coverage: f64) -> String {
    let report = raw_report(stage, ids).with_coverage(coverage);
    serde_json::to_string(&report).expect("raw report serializes")
}
