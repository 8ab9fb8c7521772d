//! Error types for the quality gate service
//!
//! Gate violations are not errors: they come back as failing verdicts.
//! Everything here means the gate could not produce a verdict at all, or an
//! administrative request was refused.

use qg_eval::ConfigError;
use qg_flake::{QuarantineError, TrackerConfigError};
use qg_report::MalformedReportError;
use std::path::PathBuf;

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Report failed validation
    #[error("malformed report: {0}")]
    MalformedReport(#[from] MalformedReportError),

    /// Gate thresholds out of range
    #[error("gate configuration: {0}")]
    GateConfig(#[from] ConfigError),

    /// Tracker bounds out of range
    #[error("tracker configuration: {0}")]
    TrackerConfig(#[from] TrackerConfigError),

    /// Quarantine request refused
    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    /// Configuration file could not be parsed
    #[error("cannot parse configuration {path}: {source}")]
    ConfigParse {
        /// File that failed
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// State file could not be decoded
    #[error("cannot decode state file {path}: {source}")]
    StateDecode {
        /// File that failed
        path: PathBuf,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// State file written by an incompatible version
    #[error("state file {path} has version {found}, expected {expected}")]
    StateVersion {
        /// File that failed
        path: PathBuf,
        /// Version found in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// Pipeline given no stages
    #[error("pipeline has no stages")]
    EmptyPipeline,

    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be rendered
    #[error("cannot render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),
}

impl GateError {
    /// Whether the caller supplied bad input, as opposed to an environment
    /// failure
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedReport(_)
                | Self::GateConfig(_)
                | Self::TrackerConfig(_)
                | Self::Quarantine(_)
                | Self::ConfigParse { .. }
                | Self::EmptyPipeline
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for service operations
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_distinguished() {
        let malformed = GateError::from(MalformedReportError::NoOutcomes);
        assert!(malformed.is_caller_error());

        let io = GateError::io(
            "state.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_caller_error());
        assert!(io.to_string().contains("state.json"));
    }
}
