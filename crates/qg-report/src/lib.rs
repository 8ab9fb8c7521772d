//! Quality Gate Reports
//!
//! Data model for CI test runs and the Run Ingestor that validates raw stage
//! reports into immutable [`RunRecord`]s.
//!
//! # Example
//!
//! ```rust
//! use qg_report::{ingest_json, Stage};
//!
//! let json = r#"{
//!     "stage": "unit",
//!     "coverage": 85,
//!     "outcomes": [
//!         {"id": "math::add", "status": "passed", "duration_ms": 3, "timestamp": "2026-01-05T09:00:00Z"}
//!     ]
//! }"#;
//!
//! let run = ingest_json(json).unwrap();
//! assert_eq!(run.stage(), Stage::Unit);
//! assert_eq!(run.summary().passed, 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod ingest;
pub mod record;
pub mod types;

// Re-exports
pub use error::MalformedReportError;
pub use ingest::{ingest, ingest_json, RawOutcome, RawReport};
pub use record::{RunRecord, RunSummary, TestOutcome};
pub use types::{RunId, Stage, TestId, TestStatus, UnknownVariant};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with run reports
    pub use crate::{
        ingest, ingest_json, MalformedReportError, RawOutcome, RawReport, RunRecord, Stage,
        TestId, TestOutcome, TestStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
