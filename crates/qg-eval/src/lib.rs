//! Quality Gate Evaluation
//!
//! Turns a [`qg_report::RunRecord`] plus a flake view into a pass/fail
//! [`Verdict`] with an ordered list of reasons.
//!
//! # Example
//!
//! ```rust
//! use qg_eval::{evaluate, GateConfig};
//! use qg_flake::FlakeSnapshot;
//! use qg_report::{RunRecord, Stage, TestOutcome, TestStatus};
//! use std::time::Duration;
//!
//! let outcome = TestOutcome::new("io::read", TestStatus::Passed, Duration::from_millis(8), chrono::Utc::now());
//! let run = RunRecord::new(Stage::Unit, vec![outcome]).with_coverage(72.0);
//!
//! let verdict = evaluate(&run, &GateConfig::default(), &FlakeSnapshot::empty());
//! assert!(!verdict.pass());
//! assert_eq!(verdict.reason_strings(), vec!["COVERAGE_BELOW_THRESHOLD: 72 < 80"]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod evaluator;
pub mod reason;
pub mod verdict;

// Re-exports
pub use config::{
    ConfigError, GateConfig, StageOverride, StagePolicy, DEFAULT_MAX_FLAKE_RATE,
    DEFAULT_MIN_COVERAGE,
};
pub use evaluator::{evaluate, GateEvaluator};
pub use reason::Reason;
pub use verdict::{Verdict, VerdictReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for gate evaluation
    pub use crate::{evaluate, GateConfig, GateEvaluator, Reason, Verdict};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
