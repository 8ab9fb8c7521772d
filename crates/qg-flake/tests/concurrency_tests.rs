//! Concurrent use of the flake tracker
//!
//! Run with: cargo test --package qg-flake --test concurrency_tests

use chrono::Duration as Span;
use qg_flake::{
    Classification, CollectingSink, FlakeTracker, ManualClock, QuarantineRequest, TrackerConfig,
};
use qg_report::{RunRecord, Stage, TestId, TestStatus};
use qg_test_utils::{base_time, outcome};
use std::sync::Arc;
use std::thread;

#[test]
fn parallel_record_applies_every_outcome() {
    let clock = Arc::new(ManualClock::new(base_time() + Span::hours(1)));
    let tracker = FlakeTracker::new(TrackerConfig::default()).with_clock(clock);

    // Large enough to take the parallel path
    let outcomes = (0..2_000)
        .map(|i| {
            let status = if i % 100 == 0 {
                TestStatus::Failed
            } else {
                TestStatus::Passed
            };
            outcome(&format!("suite::case_{i}"), status, base_time())
        })
        .collect();
    let summary = tracker.record(&RunRecord::new(Stage::Integration, outcomes));

    assert_eq!(summary.applied, 2_000);
    assert_eq!(tracker.len(), 2_000);
    assert_eq!(tracker.weekly_flake_stats().observed, 2_000);
}

#[test]
fn concurrent_pipelines_update_disjoint_tests() {
    let clock = Arc::new(ManualClock::new(base_time() + Span::hours(1)));
    let tracker = Arc::new(FlakeTracker::new(TrackerConfig::default()).with_clock(clock));

    thread::scope(|scope| {
        for worker in 0..8 {
            let tracker = Arc::clone(&tracker);
            scope.spawn(move || {
                for round in 0..10 {
                    let status = if round % 2 == 0 {
                        TestStatus::Passed
                    } else {
                        TestStatus::Failed
                    };
                    let outcomes = (0..50)
                        .map(|i| {
                            outcome(
                                &format!("w{worker}::t{i}"),
                                status,
                                base_time() + Span::seconds(round),
                            )
                        })
                        .collect();
                    tracker.record(&RunRecord::new(Stage::Unit, outcomes));
                }
            });
        }
    });

    assert_eq!(tracker.len(), 400);
    let snapshot = tracker.snapshot();
    assert!(snapshot
        .classifications
        .values()
        .all(|c| *c == Classification::Flaky));
    assert_eq!(snapshot.weekly.unreliable, 400);
}

#[test]
fn concurrent_classify_escalates_exactly_once() {
    let clock = Arc::new(ManualClock::new(base_time()));
    let sink = Arc::new(CollectingSink::new());
    let tracker = Arc::new(
        FlakeTracker::new(TrackerConfig::default())
            .with_clock(clock.clone())
            .with_sink(sink.clone()),
    );

    for (minutes, status) in [(1, TestStatus::Passed), (2, TestStatus::Failed)] {
        tracker.record(&RunRecord::new(
            Stage::E2e,
            vec![outcome("checkout::pay", status, base_time() + Span::minutes(minutes))],
        ));
    }
    tracker
        .quarantine(
            &QuarantineRequest::new()
                .test("checkout::pay")
                .owner("team-checkout")
                .ticket("CHK-9")
                .expires_at(base_time() + Span::days(2)),
        )
        .unwrap();

    clock.advance(Span::days(3));
    let id = TestId::new("checkout::pay");

    thread::scope(|scope| {
        for _ in 0..16 {
            let tracker = Arc::clone(&tracker);
            let id = id.clone();
            scope.spawn(move || tracker.classify(&id));
        }
    });

    assert_eq!(sink.len(), 1);
    assert_eq!(tracker.classify(&id), Classification::Flaky);
}
