//! Service configuration file
//!
//! ```toml
//! [gate]
//! min_coverage = 85
//! max_flake_rate = 0.02
//!
//! [gate.stages.unit]
//! max_duration_secs = 600
//! duration_blocking = true
//!
//! [tracker]
//! window_runs = 30
//! window_days = 14
//! ```
//!
//! Every section and key is optional.

use crate::error::{GateError, Result};
use qg_eval::GateConfig;
use qg_flake::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityGateConfig {
    /// Gate thresholds
    pub gate: GateConfig,
    /// Flake window bounds
    pub tracker: TrackerConfig,
}

impl QualityGateConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With gate thresholds
    #[inline]
    #[must_use]
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// With tracker bounds
    #[inline]
    #[must_use]
    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns [`GateError::ConfigParse`] for bad TOML and a configuration
    /// error for out-of-range values.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| GateError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`GateError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GateError::io(path, e))?;
        let config = Self::from_toml_str(&text, path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns [`GateError::ConfigRender`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section
    ///
    /// # Errors
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        self.gate.validate()?;
        self.tracker.validate()?;
        Ok(())
    }
}
