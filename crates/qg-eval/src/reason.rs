//! Verdict reasons
//!
//! Each reason renders as `CODE` or `CODE: detail`, the form CI logs and
//! dashboards match on.

use qg_report::record::duration_ms;
use qg_report::TestId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One finding of a gate evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// Stage produced no outcomes but requires some
    EmptyRun,

    /// Failed test that is not quarantined
    UnquarantinedFailure {
        /// Failing test
        test_id: TestId,
    },

    /// Failed test under quarantine; advisory only
    QuarantinedFailure {
        /// Failing test
        test_id: TestId,
    },

    /// Coverage under the configured floor
    CoverageBelowThreshold {
        /// Measured coverage
        actual: f64,
        /// Configured minimum
        min: f64,
    },

    /// Stage ran longer than its ceiling
    DurationExceeded {
        /// Measured duration
        #[serde(with = "duration_ms")]
        actual: Duration,
        /// Configured ceiling
        #[serde(with = "duration_ms")]
        max: Duration,
        /// Whether the stage treats the breach as blocking
        blocking: bool,
    },

    /// Weekly flake rate above the ceiling
    FlakeRateExceeded {
        /// Measured rate
        actual: f64,
        /// Configured maximum
        max: f64,
    },
}

impl Reason {
    /// Stable reason code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRun => "EMPTY_RUN",
            Self::UnquarantinedFailure { .. } => "UNQUARANTINED_FAILURE",
            Self::QuarantinedFailure { .. } => "QUARANTINED_FAILURE",
            Self::CoverageBelowThreshold { .. } => "COVERAGE_BELOW_THRESHOLD",
            Self::DurationExceeded { .. } => "DURATION_EXCEEDED",
            Self::FlakeRateExceeded { .. } => "FLAKE_RATE_EXCEEDED",
        }
    }

    /// Whether this reason fails the gate
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        match self {
            Self::EmptyRun
            | Self::UnquarantinedFailure { .. }
            | Self::CoverageBelowThreshold { .. }
            | Self::FlakeRateExceeded { .. } => true,
            Self::QuarantinedFailure { .. } => false,
            Self::DurationExceeded { blocking, .. } => *blocking,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        match self {
            Self::EmptyRun => f.write_str(code),
            Self::UnquarantinedFailure { test_id } | Self::QuarantinedFailure { test_id } => {
                write!(f, "{code}: {test_id}")
            }
            Self::CoverageBelowThreshold { actual, min } => write!(f, "{code}: {actual} < {min}"),
            Self::DurationExceeded { actual, max, .. } => {
                write!(f, "{code}: {} > {}", Seconds(*actual), Seconds(*max))
            }
            Self::FlakeRateExceeded { actual, max } => write!(f, "{code}: {actual} > {max}"),
        }
    }
}

/// Renders a duration as seconds, e.g. `120s` or `0.25s`
struct Seconds(Duration);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}
