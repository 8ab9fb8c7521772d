//! Error types for the flake tracker
//!
//! Quarantine administration errors never change tracker state.

use crate::lifecycle::Classification;
use chrono::{DateTime, Utc};
use qg_report::TestId;

/// A required quarantine field is absent or blank
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("quarantine request is missing required field '{field}'")]
pub struct MissingMetadataError {
    /// Name of the missing field
    pub field: &'static str,
}

/// Classification change outside the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// Current classification
    pub from: Classification,
    /// Requested classification
    pub to: Classification,
}

/// Quarantine administration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuarantineError {
    /// Request incomplete
    #[error(transparent)]
    MissingMetadata(#[from] MissingMetadataError),

    /// Expiry is not after the current time
    #[error("expiry {expires_at} is not in the future (now {now})")]
    ExpiryNotInFuture {
        /// Requested expiry
        expires_at: DateTime<Utc>,
        /// Tracker time when the request was checked
        now: DateTime<Utc>,
    },

    /// Test is not in a state that allows the action
    #[error("test {test_id}: {source}")]
    Lifecycle {
        /// Test the request named
        test_id: TestId,
        /// Rejected transition
        #[source]
        source: IllegalTransition,
    },

    /// Release requested for a test that is not quarantined
    #[error("test {0} is not quarantined")]
    NotQuarantined(TestId),
}

/// Invalid tracker configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerConfigError {
    /// Window must hold at least one outcome
    #[error("window_runs must be at least 1")]
    EmptyWindow,

    /// Day counts must be positive
    #[error("{field} must be at least 1 day (got {value})")]
    NonPositiveDays {
        /// Offending setting
        field: &'static str,
        /// Value as configured
        value: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metadata_names_field() {
        let err = QuarantineError::from(MissingMetadataError { field: "ticket" });
        assert!(err.to_string().contains("ticket"));
    }

    #[test]
    fn config_error_names_setting_and_value() {
        let err = TrackerConfigError::NonPositiveDays {
            field: "rate_days",
            value: 0,
        };
        assert_eq!(err.to_string(), "rate_days must be at least 1 day (got 0)");
    }

    #[test]
    fn lifecycle_error_names_test() {
        let err = QuarantineError::Lifecycle {
            test_id: TestId::new("api::health"),
            source: IllegalTransition {
                from: Classification::Stable,
                to: Classification::Quarantined,
            },
        };
        assert_eq!(
            err.to_string(),
            "test api::health: illegal transition: stable -> quarantined"
        );
    }
}
