//! Per-test classification state machine
//!
//! ```text
//! stable ⇄ flaky → quarantined → {stable | flaky}
//! ```
//!
//! Quarantine is entered only by operator action, never by `record`.

use crate::error::IllegalTransition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a test over its rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Consistent outcomes (all passing, or all failing)
    Stable,
    /// Both passes and failures in the window
    Flaky,
    /// Operator-assigned exemption until expiry
    Quarantined,
}

impl Classification {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Flaky => "flaky",
            Self::Quarantined => "quarantined",
        }
    }

    /// Whether the test counts toward the flake rate
    #[inline]
    #[must_use]
    pub fn is_unreliable(self) -> bool {
        matches!(self, Self::Flaky | Self::Quarantined)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: Classification) -> Vec<Classification> {
    use Classification::*;
    match from {
        Stable => vec![Flaky],
        Flaky => vec![Stable, Quarantined],
        Quarantined => vec![Stable, Flaky],
    }
}

/// Validates a classification change.
///
/// # Errors
/// Returns [`IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(
    from: Classification,
    to: Classification,
) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
