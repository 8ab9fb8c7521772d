//! Identifier and enumeration types shared by every quality-gate crate.

use crate::error::MalformedReportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Stable key of a single test, e.g. `suite::module::test_name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Wrap an identifier.
    ///
    /// Identifiers arriving from reports are checked by the ingestor;
    /// this constructor does not validate.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::borrow::Borrow<str> for TestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one test within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test did not run
    Skipped,
}

impl TestStatus {
    /// Wire name of the status
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" => Ok(Self::Passed),
            "failed" | "fail" => Ok(Self::Failed),
            "skipped" | "skip" => Ok(Self::Skipped),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// CI pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fast, isolated tests
    Unit,
    /// Tests against real collaborators
    Integration,
    /// End-to-end tests
    E2e,
    /// Scheduled long-running suite
    Nightly,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 4] = [Stage::Unit, Stage::Integration, Stage::E2e, Stage::Nightly];

    /// Wire name of the stage
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
            Self::E2e => "e2e",
            Self::Nightly => "nightly",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" => Ok(Self::Unit),
            "integration" => Ok(Self::Integration),
            "e2e" | "end-to-end" => Ok(Self::E2e),
            "nightly" => Ok(Self::Nightly),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Text that names no known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: '{0}'")]
pub struct UnknownVariant(pub String);

impl From<UnknownVariant> for MalformedReportError {
    fn from(value: UnknownVariant) -> Self {
        MalformedReportError::UnknownStage { stage: value.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parses_aliases() {
        assert_eq!("E2E".parse::<Stage>().unwrap(), Stage::E2e);
        assert_eq!("end-to-end".parse::<Stage>().unwrap(), Stage::E2e);
        assert_eq!(" unit ".parse::<Stage>().unwrap(), Stage::Unit);
        assert!("smoke".parse::<Stage>().is_err());
    }

    #[test]
    fn stage_order_follows_pipeline() {
        assert!(Stage::Unit < Stage::Integration);
        assert!(Stage::Integration < Stage::E2e);
        assert!(Stage::E2e < Stage::Nightly);
    }

    #[test]
    fn status_round_trips_display() {
        for status in [TestStatus::Passed, TestStatus::Failed, TestStatus::Skipped] {
            assert_eq!(status.to_string().parse::<TestStatus>().unwrap(), status);
        }
        assert!("errored".parse::<TestStatus>().is_err());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = TestId::new("auth::login");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"auth::login\"");
    }
}
