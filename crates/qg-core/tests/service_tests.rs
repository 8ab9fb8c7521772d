use pretty_assertions::assert_eq;
use qg_core::{GateError, QualityGate, QualityGateConfig, StateStore, SubmitMode};
use qg_eval::GateConfig;
use qg_flake::{Classification, FlakeTracker, ManualClock, QuarantineRequest, TrackerConfig};
use qg_report::{RawOutcome, RawReport, Stage};
use qg_test_utils::{base_time, raw_report, raw_report_json};
use std::sync::Arc;

fn gate_at(clock: &Arc<ManualClock>) -> QualityGate {
    let tracker = FlakeTracker::new(TrackerConfig::default()).with_clock(clock.clone());
    QualityGate::with_tracker(GateConfig::default(), Arc::new(tracker)).unwrap()
}

fn report(stage: &str, id: &str, status: &str, minutes: i64) -> RawReport {
    let at = base_time() + chrono::Duration::minutes(minutes);
    RawReport::new(stage).with_outcome(RawOutcome::new(id, status, 5.0, at))
}

#[test]
fn test_pipeline_passes_every_stage() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let gate = gate_at(&clock);

    let result = gate
        .run_pipeline(
            vec![
                raw_report("unit", &["u1", "u2"]),
                raw_report("integration", &["i1"]),
                raw_report("e2e", &["e1"]),
            ],
            SubmitMode::Record,
        )
        .unwrap();

    assert!(result.pass());
    assert_eq!(result.verdicts().len(), 3);
    assert_eq!(result.halted_at(), None);
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn test_pipeline_halts_at_first_blocking_stage() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let gate = gate_at(&clock);

    let result = gate
        .run_pipeline(
            vec![
                raw_report("unit", &["u1"]),
                report("integration", "i1", "failed", 0),
                raw_report("e2e", &["e1"]),
            ],
            SubmitMode::Record,
        )
        .unwrap();

    assert!(!result.pass());
    assert_eq!(result.halted_at(), Some(Stage::Integration));
    assert_eq!(result.skipped(), &["e2e".to_string()]);
    // Skipped stages never reach the tracker
    assert_eq!(gate.tracker().classify(&"e1".into()), Classification::Stable);
    assert_eq!(gate.tracker().len(), 2);
}

#[test]
fn test_pipeline_surfaces_malformed_stage() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let gate = gate_at(&clock);

    let err = gate
        .run_pipeline(
            vec![raw_report("unit", &["u1"]), RawReport::new("staging")],
            SubmitMode::Record,
        )
        .unwrap_err();

    assert!(matches!(err, GateError::MalformedReport(_)));
    assert!(err.is_caller_error());
    assert_eq!(gate.tracker().len(), 1);
}

#[test]
fn test_json_pipeline_skips_undecoded_reports_after_a_blocking_stage() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let gate = gate_at(&clock);
    let unit = raw_report_json("unit", &["u1"], 91.0);
    let failing = serde_json::to_string(&report("integration", "i1", "failed", 0)).unwrap();

    let result = gate
        .run_pipeline_json(
            [
                ("unit.json", unit.as_str()),
                ("integration.json", failing.as_str()),
                ("e2e.json", "{ not json"),
            ],
            SubmitMode::Record,
        )
        .unwrap();

    assert_eq!(result.halted_at(), Some(Stage::Integration));
    assert_eq!(result.skipped(), &["e2e.json".to_string()]);
    assert_eq!(gate.tracker().len(), 2);
}

#[test]
fn test_json_pipeline_rejects_a_malformed_stage_once_reached() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let gate = gate_at(&clock);
    let unit = raw_report_json("unit", &["u1", "u2"], 91.0);

    let err = gate
        .run_pipeline_json(
            [("unit.json", unit.as_str()), ("e2e.json", "{ not json")],
            SubmitMode::Record,
        )
        .unwrap_err();

    assert!(matches!(err, GateError::MalformedReport(_)));
    // The unit stage ran before the bad report was decoded
    assert_eq!(gate.tracker().len(), 2);
}

#[test]
fn test_empty_pipeline_is_rejected() {
    let gate = QualityGate::new(&QualityGateConfig::default()).unwrap();
    let err = gate
        .run_pipeline(Vec::new(), SubmitMode::Record)
        .unwrap_err();
    assert!(matches!(err, GateError::EmptyPipeline));
}

#[test]
fn test_history_survives_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("flakes.json"));
    let clock = Arc::new(ManualClock::new(base_time()));

    // First CI invocation: the test passes, then fails
    {
        let gate = gate_at(&clock);
        gate.load_state(store.load().unwrap());
        gate.submit(report("unit", "cache::evict", "passed", 0), SubmitMode::Record)
            .unwrap();
        gate.submit(report("unit", "cache::evict", "failed", 1), SubmitMode::Record)
            .unwrap();
        store.save(&gate.export_state()).unwrap();
    }

    // Second invocation: quarantine it and re-run
    let gate = gate_at(&clock);
    gate.load_state(store.load().unwrap());
    assert_eq!(gate.tracker().classify(&"cache::evict".into()), Classification::Flaky);

    gate.quarantine(
        &QuarantineRequest::new()
            .test("cache::evict")
            .owner("storage")
            .ticket("QA-301")
            .expires_at(base_time() + chrono::Duration::days(5)),
    )
    .unwrap();
    store.save(&gate.export_state()).unwrap();

    let gate = QualityGate::with_tracker(
        GateConfig::default().with_max_flake_rate(1.0),
        Arc::new(FlakeTracker::new(TrackerConfig::default()).with_clock(clock.clone())),
    )
    .unwrap();
    gate.load_state(store.load().unwrap());
    let verdict = gate
        .submit(report("unit", "cache::evict", "failed", 2), SubmitMode::Record)
        .unwrap();

    assert!(verdict.pass());
    assert_eq!(verdict.reason_strings(), vec!["QUARANTINED_FAILURE: cache::evict"]);
}

#[test]
fn test_config_file_drives_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gate.toml");
    std::fs::write(&path, "[gate]\nmin_coverage = 95\n").unwrap();

    let config = QualityGateConfig::load(&path).unwrap();
    let gate = QualityGate::new(&config).unwrap();
    let verdict = gate
        .submit(raw_report("unit", &["a"]).with_coverage(90.0), SubmitMode::DryRun)
        .unwrap();

    assert!(!verdict.pass());
    assert_eq!(verdict.reason_strings(), vec!["COVERAGE_BELOW_THRESHOLD: 90 < 95"]);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = QualityGateConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, GateError::Io { .. }));
    assert!(!err.is_caller_error());
}
