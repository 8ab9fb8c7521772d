//! Quality Gate Flake Tracking
//!
//! Per-test outcome history, flaky-test classification and the operator
//! quarantine lifecycle.
//!
//! # Overview
//!
//! - **FlakeTracker**: rolling window per test, behind per-test locks
//! - **Classification**: `stable ⇄ flaky → quarantined → {stable | flaky}`
//! - **EscalationSink**: receives an event when a quarantine expires unresolved
//! - **FlakeSnapshot**: frozen view handed to the gate evaluator
//!
//! # Example
//!
//! ```rust
//! use qg_flake::{Classification, FlakeTracker, TrackerConfig};
//! use qg_report::{RunRecord, Stage, TestOutcome, TestStatus};
//! use std::time::Duration;
//!
//! let tracker = FlakeTracker::new(TrackerConfig::default());
//! for status in [TestStatus::Passed, TestStatus::Failed, TestStatus::Passed] {
//!     let outcome = TestOutcome::new("net::retry", status, Duration::from_millis(4), chrono::Utc::now());
//!     tracker.record(&RunRecord::new(Stage::Unit, vec![outcome]));
//! }
//!
//! assert_eq!(tracker.classify(&"net::retry".into()), Classification::Flaky);
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod escalation;
pub mod lifecycle;
pub mod quarantine;
pub mod state;
pub mod tracker;
pub mod view;
pub mod window;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{IllegalTransition, MissingMetadataError, QuarantineError, TrackerConfigError};
pub use escalation::{CollectingSink, EscalationEvent, EscalationSink, TracingSink};
pub use lifecycle::{allowed_transitions, validate_transition, Classification};
pub use quarantine::{Quarantine, QuarantineRequest};
pub use state::{PersistedTest, TrackerState};
pub use tracker::{FlakeTracker, RecordSummary, TestHealth, Transition};
pub use view::{FlakeClassificationView, FlakeRate, FlakeSnapshot};
pub use window::{OutcomeWindow, WindowCounts, WindowEntry};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for flake tracking
    pub use crate::{
        Classification, EscalationEvent, EscalationSink, FlakeClassificationView, FlakeSnapshot,
        FlakeTracker, QuarantineRequest, TrackerConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
