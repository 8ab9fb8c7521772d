//! Flake Tracker
//!
//! Holds the rolling outcome window of every test seen by the gate and
//! derives its classification. This is the only long-lived mutable state in
//! the quality gate.
//!
//! Each test lives behind its own mutex inside a [`DashMap`]. The map is
//! only touched to find or insert a test's slot; all updates lock a single
//! test, so outcomes for different tests never wait on each other.
//!
//! A test whose window has fully aged out and that holds no quarantine is
//! idle. Idle tests are dropped whenever the tracker is surveyed or
//! exported, so renamed and deleted tests do not accumulate.

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::{IllegalTransition, QuarantineError};
use crate::escalation::{EscalationEvent, EscalationSink, TracingSink};
use crate::lifecycle::{validate_transition, Classification};
use crate::quarantine::{Quarantine, QuarantineRequest};
use crate::state::{PersistedTest, TrackerState};
use crate::view::{FlakeClassificationView, FlakeRate, FlakeSnapshot};
use crate::window::{OutcomeWindow, WindowCounts, WindowEntry};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use qg_report::{RunId, RunRecord, TestId, TestOutcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs with at least this many outcomes are applied in parallel
const PARALLEL_RECORD_THRESHOLD: usize = 256;

#[derive(Debug)]
struct FlakeState {
    window: OutcomeWindow,
    quarantine: Option<Quarantine>,
    /// Last classification seen, for transition logging
    last: Classification,
    /// Removed from the map; writers must fetch a fresh slot
    detached: bool,
}

impl Default for FlakeState {
    fn default() -> Self {
        Self {
            window: OutcomeWindow::new(),
            quarantine: None,
            last: Classification::Stable,
            detached: false,
        }
    }
}

impl FlakeState {
    fn derived(&self) -> Classification {
        if self.window.counts().is_flaky() {
            Classification::Flaky
        } else {
            Classification::Stable
        }
    }

    fn current(&self) -> Classification {
        if self.quarantine.is_some() {
            Classification::Quarantined
        } else {
            self.derived()
        }
    }

    fn is_idle(&self) -> bool {
        self.window.is_empty() && self.quarantine.is_none()
    }
}

type Slot = Arc<Mutex<FlakeState>>;

/// Classification change of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Test that changed
    pub test_id: TestId,
    /// Previous classification
    pub from: Classification,
    /// New classification
    pub to: Classification,
}

/// Result of recording one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Outcomes appended
    pub applied: usize,
    /// Classification changes caused by the run
    pub transitions: Vec<Transition>,
}

/// Detailed state of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestHealth {
    /// Test identifier
    pub test_id: TestId,
    /// Current classification
    pub classification: Classification,
    /// Window holds failures and no passes
    pub regressed: bool,
    /// Window counts
    pub counts: WindowCounts,
    /// Most recent outcome
    pub last_seen: Option<DateTime<Utc>>,
    /// Active quarantine
    pub quarantine: Option<Quarantine>,
}

/// Historical per-test outcome store
#[derive(Debug)]
pub struct FlakeTracker {
    config: TrackerConfig,
    tests: DashMap<TestId, Slot>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EscalationSink>,
}

impl FlakeTracker {
    /// Create tracker using the system clock and a logging sink
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tests: DashMap::new(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(TracingSink),
        }
    }

    /// With time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With escalation receiver
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EscalationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Current time according to the tracker clock
    #[inline]
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Number of tracked tests
    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether no test is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Tracked test identifiers, sorted
    #[must_use]
    pub fn tests(&self) -> Vec<TestId> {
        let mut ids: Vec<TestId> = self.tests.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Append every outcome of `run` to its test's window.
    ///
    /// Outcomes are independent and may be applied in any order; large runs
    /// are applied in parallel. All outcomes are applied before this returns.
    pub fn record(&self, run: &RunRecord) -> RecordSummary {
        let now = self.clock.now();
        let run_id = run.id();
        let outcomes = run.outcomes();

        let transitions: Vec<Transition> = if outcomes.len() >= PARALLEL_RECORD_THRESHOLD {
            outcomes
                .par_iter()
                .filter_map(|o| self.apply(o, run_id, now))
                .collect()
        } else {
            outcomes
                .iter()
                .filter_map(|o| self.apply(o, run_id, now))
                .collect()
        };

        tracing::debug!(
            run = %run_id,
            stage = %run.stage(),
            applied = outcomes.len(),
            transitions = transitions.len(),
            "Recorded run"
        );

        RecordSummary {
            applied: outcomes.len(),
            transitions,
        }
    }

    /// Classify a test, expiring its quarantine if due.
    ///
    /// The first call after a quarantine's expiry removes it and sends one
    /// [`EscalationEvent`] to the sink. Unknown tests are stable.
    pub fn classify(&self, id: &TestId) -> Classification {
        let Some(slot) = self.slot(id) else {
            return Classification::Stable;
        };
        let now = self.clock.now();
        let (classification, event) = {
            let mut state = slot.lock();
            self.refresh(id, &mut state, now)
        };
        self.emit(event);
        classification
    }

    /// Detailed view of one test
    #[must_use]
    pub fn inspect(&self, id: &TestId) -> Option<TestHealth> {
        let slot = self.slot(id)?;
        let now = self.clock.now();
        let (health, event) = {
            let mut state = slot.lock();
            let (classification, event) = self.refresh(id, &mut state, now);
            let counts = state.window.counts();
            let health = TestHealth {
                test_id: id.clone(),
                classification,
                regressed: counts.is_regressed(),
                counts,
                last_seen: state.window.last_seen(),
                quarantine: state.quarantine.clone(),
            };
            (health, event)
        };
        self.emit(event);
        Some(health)
    }

    /// Flake rate over the trailing period
    #[must_use]
    pub fn weekly_flake_stats(&self) -> FlakeRate {
        self.survey().1
    }

    /// Fraction of tests observed in the trailing period that are flaky or
    /// quarantined
    #[must_use]
    pub fn weekly_flake_rate(&self) -> f64 {
        self.weekly_flake_stats().rate()
    }

    /// Point-in-time copy of all classifications and the flake rate
    #[must_use]
    pub fn snapshot(&self) -> FlakeSnapshot {
        let (classifications, weekly) = self.survey();
        FlakeSnapshot {
            classifications,
            weekly,
            taken_at: Some(self.clock.now()),
        }
    }

    /// Place a flaky test into quarantine.
    ///
    /// # Errors
    /// - [`QuarantineError::MissingMetadata`] if a required field is absent
    /// - [`QuarantineError::ExpiryNotInFuture`] if the expiry has passed
    /// - [`QuarantineError::Lifecycle`] if the test is not currently flaky
    pub fn quarantine(&self, request: &QuarantineRequest) -> Result<Quarantine, QuarantineError> {
        let now = self.clock.now();
        let (id, quarantine) = request.validate(now)?;

        let Some(slot) = self.slot(&id) else {
            return Err(QuarantineError::Lifecycle {
                test_id: id,
                source: IllegalTransition {
                    from: Classification::Stable,
                    to: Classification::Quarantined,
                },
            });
        };

        let (result, event) = {
            let mut state = slot.lock();
            let (current, event) = self.refresh(&id, &mut state, now);
            let result = match validate_transition(current, Classification::Quarantined) {
                Ok(()) => {
                    state.quarantine = Some(quarantine.clone());
                    state.last = Classification::Quarantined;
                    Ok(quarantine)
                }
                Err(source) => Err(QuarantineError::Lifecycle {
                    test_id: id.clone(),
                    source,
                }),
            };
            (result, event)
        };
        self.emit(event);

        if let Ok(q) = &result {
            tracing::info!(
                test = %id,
                owner = %q.owner,
                ticket = %q.ticket,
                expires_at = %q.expires_at,
                "Test quarantined"
            );
        }
        result
    }

    /// Resolve a quarantine before its expiry. No escalation is sent.
    ///
    /// # Errors
    /// Returns [`QuarantineError::NotQuarantined`] if the test has no active
    /// quarantine (including one that just expired).
    pub fn release(&self, id: &TestId) -> Result<Quarantine, QuarantineError> {
        let slot = self
            .slot(id)
            .ok_or_else(|| QuarantineError::NotQuarantined(id.clone()))?;
        let now = self.clock.now();

        let (released, event) = {
            let mut state = slot.lock();
            let (_, event) = self.refresh(id, &mut state, now);
            let released = state.quarantine.take();
            if released.is_some() {
                self.note_transition(id, &mut state);
            }
            (released, event)
        };
        self.emit(event);

        let released = released.ok_or_else(|| QuarantineError::NotQuarantined(id.clone()))?;
        tracing::info!(test = %id, ticket = %released.ticket, "Quarantine released");
        Ok(released)
    }

    /// Expire every due quarantine, sending one escalation each.
    ///
    /// Returns the number of escalations sent.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut events = Vec::new();
        for (id, slot) in self.slots() {
            let mut state = slot.lock();
            if state.quarantine.as_ref().is_some_and(|q| q.is_expired(now)) {
                let (_, event) = self.refresh(&id, &mut state, now);
                events.extend(event);
            }
        }
        let count = events.len();
        for event in events {
            self.sink.escalate(event);
        }
        count
    }

    /// Copy of the full history. Idle tests are dropped first.
    #[must_use]
    pub fn export(&self) -> TrackerState {
        self.prune_idle(self.clock.now());
        let mut state = TrackerState::new();
        for (id, slot) in self.slots() {
            let guard = slot.lock();
            state.tests.insert(
                id,
                PersistedTest {
                    window: guard.window.iter().copied().collect(),
                    quarantine: guard.quarantine.clone(),
                },
            );
        }
        state
    }

    /// Load persisted history, replacing any existing entries for the same
    /// tests.
    pub fn load(&self, state: TrackerState) {
        let count = state.tests.len();
        for (id, persisted) in state.tests {
            let mut flake_state = FlakeState {
                window: OutcomeWindow::from_entries(persisted.window),
                quarantine: persisted.quarantine,
                last: Classification::Stable,
                detached: false,
            };
            flake_state.last = flake_state.current();
            self.tests.insert(id, Arc::new(Mutex::new(flake_state)));
        }
        tracing::debug!(tests = count, "Loaded tracker state");
    }

    fn slot(&self, id: &TestId) -> Option<Slot> {
        self.tests.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_insert(&self, id: &TestId) -> Slot {
        if let Some(slot) = self.slot(id) {
            return slot;
        }
        Arc::clone(self.tests.entry(id.clone()).or_default().value())
    }

    /// Clone out every slot so no map guard is held while locking a test
    fn slots(&self) -> Vec<(TestId, Slot)> {
        self.tests
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.config.window_age()
    }

    fn apply(&self, outcome: &TestOutcome, run: RunId, now: DateTime<Utc>) -> Option<Transition> {
        loop {
            let slot = self.slot_or_insert(outcome.id());
            let mut state = slot.lock();
            if state.detached {
                // Pruned between lookup and lock
                continue;
            }
            state.window.push(WindowEntry {
                run,
                status: outcome.status(),
                timestamp: outcome.timestamp(),
            });
            state.window.evict(self.cutoff(now), self.config.window_runs);
            return self.note_transition(outcome.id(), &mut state);
        }
    }

    /// Evict aged entries everywhere and drop idle tests, returning how many
    /// were dropped.
    ///
    /// Lock order is map shard, then test. No other path holds a test lock
    /// while touching the map.
    fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut pruned = 0;
        self.tests.retain(|_, slot| {
            let mut state = slot.lock();
            state.window.evict(cutoff, self.config.window_runs);
            if state.is_idle() {
                state.detached = true;
                pruned += 1;
                false
            } else {
                true
            }
        });
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped idle tests");
        }
        pruned
    }

    /// Evict aged entries and expire a lapsed quarantine. Caller holds the
    /// test's lock and must emit the returned event after releasing it.
    fn refresh(
        &self,
        id: &TestId,
        state: &mut FlakeState,
        now: DateTime<Utc>,
    ) -> (Classification, Option<EscalationEvent>) {
        state.window.evict(self.cutoff(now), self.config.window_runs);

        let mut event = None;
        if state.quarantine.as_ref().is_some_and(|q| q.is_expired(now)) {
            if let Some(expired) = state.quarantine.take() {
                event = Some(EscalationEvent {
                    test_id: id.clone(),
                    owner: expired.owner,
                    ticket: expired.ticket,
                    expired_at: expired.expires_at,
                    detected_at: now,
                    reverted_to: state.derived(),
                });
            }
        }

        self.note_transition(id, state);
        (state.current(), event)
    }

    fn note_transition(&self, id: &TestId, state: &mut FlakeState) -> Option<Transition> {
        let to = state.current();
        let from = state.last;
        if from == to {
            return None;
        }
        state.last = to;

        if let Err(err) = validate_transition(from, to) {
            tracing::error!(test = %id, error = %err, "Unexpected classification change");
        }
        tracing::info!(test = %id, from = %from, to = %to, "Test classification changed");

        Some(Transition {
            test_id: id.clone(),
            from,
            to,
        })
    }

    fn survey(&self) -> (BTreeMap<TestId, Classification>, FlakeRate) {
        let now = self.clock.now();
        let since = now - self.config.rate_period();
        let mut classifications = BTreeMap::new();
        let mut rate = FlakeRate::default();
        let mut events = Vec::new();

        for (id, slot) in self.slots() {
            let (classification, observed, idle) = {
                let mut state = slot.lock();
                let (classification, event) = self.refresh(&id, &mut state, now);
                events.extend(event);
                (classification, state.window.observed_since(since), state.is_idle())
            };
            if observed {
                rate.observed += 1;
                if classification.is_unreliable() {
                    rate.unreliable += 1;
                }
            }
            if !idle {
                classifications.insert(id, classification);
            }
        }

        for event in events {
            self.sink.escalate(event);
        }
        self.prune_idle(now);
        (classifications, rate)
    }

    fn emit(&self, event: Option<EscalationEvent>) {
        if let Some(event) = event {
            self.sink.escalate(event);
        }
    }
}

impl Default for FlakeTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl FlakeClassificationView for FlakeTracker {
    fn classification(&self, id: &TestId) -> Classification {
        self.classify(id)
    }

    fn weekly_flake_rate(&self) -> f64 {
        FlakeTracker::weekly_flake_rate(self)
    }
}
