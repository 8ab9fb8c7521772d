//! Quality Gate Service
//!
//! Composition root for CI quality gating: a [`QualityGate`] ingests stage
//! reports, keeps flake history, and produces verdicts. Configuration comes
//! from a TOML file and flake history persists in a JSON state file between
//! CI invocations.
//!
//! # Example
//!
//! ```rust
//! use qg_core::{QualityGate, QualityGateConfig, SubmitMode};
//!
//! let gate = QualityGate::new(&QualityGateConfig::default()).unwrap();
//! let verdict = gate
//!     .submit_json(
//!         r#"{"stage": "unit", "coverage": 91,
//!             "outcomes": [{"id": "a", "status": "passed", "duration_ms": 2,
//!                           "timestamp": "2026-03-02T10:00:00Z"}]}"#,
//!         SubmitMode::Record,
//!     )
//!     .unwrap();
//! assert!(verdict.pass());
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod store;

// Re-exports
pub use config::QualityGateConfig;
pub use error::{GateError, Result};
pub use gate::{QualityGate, StatusReport, SubmitMode};
pub use pipeline::PipelineReport;
pub use store::StateStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the gate
    pub use crate::{GateError, QualityGate, QualityGateConfig, StateStore, SubmitMode};
    pub use qg_eval::{GateConfig, Reason, Verdict};
    pub use qg_flake::{Classification, QuarantineRequest, TrackerConfig};
    pub use qg_report::{RawReport, Stage, TestId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
