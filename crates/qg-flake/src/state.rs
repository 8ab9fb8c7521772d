//! Serializable tracker state for persistence between CI invocations.

use crate::quarantine::Quarantine;
use crate::window::WindowEntry;
use qg_report::TestId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full tracker history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    /// Format version
    pub version: u32,
    /// Per-test history
    pub tests: BTreeMap<TestId, PersistedTest>,
}

/// History of one test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTest {
    /// Window entries, oldest first
    pub window: Vec<WindowEntry>,
    /// Active quarantine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine: Option<Quarantine>,
}

impl TrackerState {
    /// Format version written by this crate
    pub const CURRENT_VERSION: u32 = 1;

    /// Empty state
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            tests: BTreeMap::new(),
        }
    }
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new()
    }
}
