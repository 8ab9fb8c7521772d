//! Quarantine requests and metadata
//!
//! Every quarantine carries an owner, a ticket and an expiry. Requests come
//! from operators, so fields are optional here and checked in
//! [`QuarantineRequest::validate`].

use crate::error::{MissingMetadataError, QuarantineError};
use chrono::{DateTime, Utc};
use qg_report::TestId;
use serde::{Deserialize, Serialize};

/// Operator request to quarantine a test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRequest {
    /// Test to quarantine
    pub test_id: Option<String>,
    /// Person or team responsible for the fix
    pub owner: Option<String>,
    /// Issue tracking the fix
    pub ticket: Option<String>,
    /// When the exemption lapses
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuarantineRequest {
    /// Create empty request
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With test identifier
    #[inline]
    #[must_use]
    pub fn test(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    /// With owner
    #[inline]
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// With ticket reference
    #[inline]
    #[must_use]
    pub fn ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    /// With expiry
    #[inline]
    #[must_use]
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check required fields and expiry against `now`
    ///
    /// # Errors
    /// [`QuarantineError::MissingMetadata`] for an absent or blank field,
    /// [`QuarantineError::ExpiryNotInFuture`] for a lapsed expiry.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(TestId, Quarantine), QuarantineError> {
        let test_id = required(self.test_id.as_deref(), "test_id")?;
        let owner = required(self.owner.as_deref(), "owner")?;
        let ticket = required(self.ticket.as_deref(), "ticket")?;
        let expires_at = self
            .expires_at
            .ok_or(MissingMetadataError { field: "expires_at" })?;

        if expires_at <= now {
            return Err(QuarantineError::ExpiryNotInFuture { expires_at, now });
        }

        Ok((
            TestId::new(test_id),
            Quarantine {
                owner: owner.to_string(),
                ticket: ticket.to_string(),
                expires_at,
                placed_at: now,
            },
        ))
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, MissingMetadataError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(MissingMetadataError { field })
}

/// Active quarantine on a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarantine {
    /// Responsible owner
    pub owner: String,
    /// Tracking ticket
    pub ticket: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// When the quarantine was placed
    pub placed_at: DateTime<Utc>,
}

impl Quarantine {
    /// Whether the quarantine has lapsed at `now`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
