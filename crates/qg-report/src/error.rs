//! Error types for report ingestion
//!
//! Every variant names the offending field, and outcome-level variants carry
//! the outcome's index in the report so the caller can fix the input.
//! Ingestion errors are never retried.

/// Structural violation found while ingesting a run report
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedReportError {
    /// Report could not be decoded at all
    #[error("report could not be decoded: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// Stage name is not a known stage
    #[error("unknown stage: '{stage}'")]
    UnknownStage {
        /// Stage name as given
        stage: String,
    },

    /// Report has no outcomes and was not marked empty or partial
    #[error("report has no outcomes and is not marked empty")]
    NoOutcomes,

    /// Report is marked empty but lists outcomes
    #[error("report is marked empty but lists {count} outcomes")]
    EmptyFlagWithOutcomes {
        /// Number of outcomes listed
        count: usize,
    },

    /// Outcome identifier is empty or whitespace
    #[error("outcome {index}: empty test identifier")]
    EmptyTestId {
        /// Position of the outcome in the report
        index: usize,
    },

    /// Outcome is missing a required field
    #[error("outcome {index}: missing field '{field}'")]
    MissingField {
        /// Position of the outcome in the report
        index: usize,
        /// Name of the absent field
        field: &'static str,
    },

    /// Outcome status is not one of passed, failed, skipped
    #[error("outcome {index}: unknown status '{status}'")]
    UnknownStatus {
        /// Position of the outcome in the report
        index: usize,
        /// Status as given
        status: String,
    },

    /// Outcome duration is negative or not a number
    #[error("outcome {index}: invalid duration {duration_ms}ms")]
    InvalidOutcomeDuration {
        /// Position of the outcome in the report
        index: usize,
        /// Duration as given
        duration_ms: f64,
    },

    /// Coverage is outside 0..=100 or not a number
    #[error("coverage {coverage} is outside 0..=100")]
    CoverageOutOfRange {
        /// Coverage as given
        coverage: f64,
    },

    /// Total duration is negative or not a number
    #[error("invalid total duration {duration_ms}ms")]
    InvalidTotalDuration {
        /// Duration as given
        duration_ms: f64,
    },
}

impl MalformedReportError {
    /// Index of the offending outcome, if the error is outcome-level
    #[must_use]
    pub fn outcome_index(&self) -> Option<usize> {
        match self {
            Self::EmptyTestId { index }
            | Self::MissingField { index, .. }
            | Self::UnknownStatus { index, .. }
            | Self::InvalidOutcomeDuration { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MalformedReportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode {
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_errors_expose_index() {
        let err = MalformedReportError::UnknownStatus {
            index: 4,
            status: "errored".to_string(),
        };
        assert_eq!(err.outcome_index(), Some(4));
        assert!(err.to_string().contains("outcome 4"));
        assert_eq!(MalformedReportError::NoOutcomes.outcome_index(), None);
    }

    #[test]
    fn messages_carry_field_values() {
        let cases = [
            (
                MalformedReportError::MissingField {
                    index: 2,
                    field: "timestamp",
                },
                "outcome 2: missing field 'timestamp'",
            ),
            (
                MalformedReportError::UnknownStage {
                    stage: "canary".to_string(),
                },
                "unknown stage: 'canary'",
            ),
            (
                MalformedReportError::EmptyFlagWithOutcomes { count: 3 },
                "report is marked empty but lists 3 outcomes",
            ),
            (
                MalformedReportError::InvalidOutcomeDuration {
                    index: 0,
                    duration_ms: -1.5,
                },
                "outcome 0: invalid duration -1.5ms",
            ),
            (
                MalformedReportError::CoverageOutOfRange { coverage: 120.0 },
                "coverage 120 is outside 0..=100",
            ),
        ];
        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
        }
    }
}
