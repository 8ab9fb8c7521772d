//! Gate thresholds
//!
//! Configuration is supplied once at construction and never mutated while
//! evaluating. Per-stage settings are overrides on top of built-in stage
//! defaults, so a config file only needs to name what it changes.

use qg_report::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default minimum coverage percentage
pub const DEFAULT_MIN_COVERAGE: f64 = 80.0;

/// Default maximum weekly flake rate
pub const DEFAULT_MAX_FLAKE_RATE: f64 = 0.01;

/// Invalid gate configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ConfigError {
    /// Offending field
    pub field: String,
    /// What is wrong with it
    pub reason: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Effective rules for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    /// Duration ceiling, `None` for no limit
    pub max_duration: Option<Duration>,
    /// Whether a duration breach fails the gate
    pub duration_blocking: bool,
    /// Whether a run without outcomes is acceptable
    pub allow_empty: bool,
}

impl StagePolicy {
    /// Built-in policy for a stage
    #[must_use]
    pub fn defaults(stage: Stage) -> Self {
        let (max_secs, allow_empty) = match stage {
            Stage::Unit => (Some(300), false),
            Stage::Integration => (Some(900), false),
            Stage::E2e => (Some(1800), false),
            Stage::Nightly => (None, true),
        };
        Self {
            max_duration: max_secs.map(Duration::from_secs),
            duration_blocking: false,
            allow_empty,
        }
    }
}

/// Per-stage overrides as written in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageOverride {
    /// Duration ceiling in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<f64>,
    /// Whether a duration breach fails the gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_blocking: Option<bool>,
    /// Whether a run without outcomes is acceptable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_empty: Option<bool>,
}

/// Gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Minimum coverage percentage
    pub min_coverage: f64,
    /// Maximum weekly flake rate (fraction, 0..=1)
    pub max_flake_rate: f64,
    /// Stage overrides
    pub stages: BTreeMap<Stage, StageOverride>,
}

impl GateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With minimum coverage
    #[inline]
    #[must_use]
    pub fn with_min_coverage(mut self, min: f64) -> Self {
        self.min_coverage = min;
        self
    }

    /// With maximum weekly flake rate
    #[inline]
    #[must_use]
    pub fn with_max_flake_rate(mut self, max: f64) -> Self {
        self.max_flake_rate = max;
        self
    }

    /// With duration ceiling for a stage
    #[must_use]
    pub fn with_max_duration(mut self, stage: Stage, max: Duration) -> Self {
        self.stages.entry(stage).or_default().max_duration_secs = Some(max.as_secs_f64());
        self
    }

    /// Make duration breaches block for a stage
    #[must_use]
    pub fn with_duration_blocking(mut self, stage: Stage, blocking: bool) -> Self {
        self.stages.entry(stage).or_default().duration_blocking = Some(blocking);
        self
    }

    /// Allow or forbid empty runs for a stage
    #[must_use]
    pub fn with_allow_empty(mut self, stage: Stage, allow: bool) -> Self {
        self.stages.entry(stage).or_default().allow_empty = Some(allow);
        self
    }

    /// Effective policy for a stage
    #[must_use]
    pub fn policy(&self, stage: Stage) -> StagePolicy {
        let mut policy = StagePolicy::defaults(stage);
        if let Some(o) = self.stages.get(&stage) {
            if let Some(secs) = o.max_duration_secs {
                policy.max_duration = Duration::try_from_secs_f64(secs).ok();
            }
            if let Some(blocking) = o.duration_blocking {
                policy.duration_blocking = blocking;
            }
            if let Some(allow) = o.allow_empty {
                policy.allow_empty = allow;
            }
        }
        policy
    }

    /// Check ranges
    ///
    /// # Errors
    /// Returns [`ConfigError`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_coverage.is_finite() || !(0.0..=100.0).contains(&self.min_coverage) {
            return Err(ConfigError::new(
                "min_coverage",
                format!("{} is outside 0..=100", self.min_coverage),
            ));
        }
        if !self.max_flake_rate.is_finite() || !(0.0..=1.0).contains(&self.max_flake_rate) {
            return Err(ConfigError::new(
                "max_flake_rate",
                format!("{} is outside 0..=1", self.max_flake_rate),
            ));
        }
        for (stage, o) in &self.stages {
            if let Some(secs) = o.max_duration_secs {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(ConfigError::new(
                        format!("stages.{stage}.max_duration_secs"),
                        format!("{secs} must be a positive number of seconds"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            max_flake_rate: DEFAULT_MAX_FLAKE_RATE,
            stages: BTreeMap::new(),
        }
    }
}
