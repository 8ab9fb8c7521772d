//! Escalation of unresolved quarantines
//!
//! An expired quarantine is a process failure: the owner did not fix or
//! release the test in time. The tracker hands one [`EscalationEvent`] per
//! expiry to its [`EscalationSink`].

use crate::lifecycle::Classification;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use qg_report::TestId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Notification that a quarantine expired unresolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEvent {
    /// Test whose quarantine expired
    pub test_id: TestId,
    /// Owner recorded on the quarantine
    pub owner: String,
    /// Ticket recorded on the quarantine
    pub ticket: String,
    /// Quarantine expiry
    pub expired_at: DateTime<Utc>,
    /// When the expiry was noticed
    pub detected_at: DateTime<Utc>,
    /// Classification the test reverted to
    pub reverted_to: Classification,
}

impl fmt::Display for EscalationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quarantine of {} expired at {} (owner {}, ticket {}); now {}",
            self.test_id,
            self.expired_at.to_rfc3339(),
            self.owner,
            self.ticket,
            self.reverted_to
        )
    }
}

/// Receiver of escalation events
pub trait EscalationSink: Send + Sync + Debug {
    /// Deliver one event
    fn escalate(&self, event: EscalationEvent);
}

/// Sink that logs escalations at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EscalationSink for TracingSink {
    fn escalate(&self, event: EscalationEvent) {
        tracing::warn!(
            test = %event.test_id,
            owner = %event.owner,
            ticket = %event.ticket,
            expired_at = %event.expired_at,
            reverted_to = %event.reverted_to,
            "Quarantine expired unresolved"
        );
    }
}

/// Sink that buffers events for the caller
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EscalationEvent>>,
}

impl CollectingSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of buffered events
    #[must_use]
    pub fn events(&self) -> Vec<EscalationEvent> {
        self.events.lock().clone()
    }

    /// Take all buffered events
    pub fn drain(&self) -> Vec<EscalationEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of buffered events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events are buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EscalationSink for CollectingSink {
    fn escalate(&self, event: EscalationEvent) {
        TracingSink.escalate(event.clone());
        self.events.lock().push(event);
    }
}
