//! Tracker state file
//!
//! The flake history outlives a single CI invocation, so it is kept as a
//! JSON document between runs. Writes go to a temporary file in the same
//! directory and are renamed into place, so a crash never leaves a torn
//! file behind.

use crate::error::{GateError, Result};
use qg_flake::TrackerState;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON file holding [`TrackerState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; a missing file is an empty history
    ///
    /// # Errors
    /// Returns [`GateError::Io`] if the file exists but cannot be read,
    /// [`GateError::StateDecode`] for invalid JSON and
    /// [`GateError::StateVersion`] for an unsupported format version.
    pub fn load(&self) -> Result<TrackerState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state file, starting empty");
                return Ok(TrackerState::new());
            }
            Err(e) => return Err(GateError::io(&self.path, e)),
        };

        let state: TrackerState =
            serde_json::from_slice(&bytes).map_err(|source| GateError::StateDecode {
                path: self.path.clone(),
                source,
            })?;
        if state.version != TrackerState::CURRENT_VERSION {
            return Err(GateError::StateVersion {
                path: self.path.clone(),
                found: state.version,
                expected: TrackerState::CURRENT_VERSION,
            });
        }
        tracing::debug!(path = %self.path.display(), tests = state.tests.len(), "Loaded state");
        Ok(state)
    }

    /// Replace the file with `state`
    ///
    /// # Errors
    /// Returns [`GateError::Io`] if the temporary file cannot be written or
    /// renamed.
    pub fn save(&self, state: &TrackerState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| GateError::io(dir, e))?;

        let json = serde_json::to_vec_pretty(state)?;
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| GateError::io(dir, e))?;
        file.write_all(&json)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| GateError::io(file.path(), e))?;
        file.persist(&self.path)
            .map_err(|e| GateError::io(&self.path, e.error))?;

        tracing::debug!(path = %self.path.display(), tests = state.tests.len(), "Saved state");
        Ok(())
    }
}
