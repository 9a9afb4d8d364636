//! Guest session aggregate.

use super::{SessionDomainError, SessionToken};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Validated, strictly positive session lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl(TimeDelta);

impl SessionTtl {
    /// Creates a lifetime from a number of hours.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NonPositiveTtl`] when `hours` is zero or
    /// negative and [`SessionDomainError::TtlOutOfRange`] when it overflows.
    pub fn from_hours(hours: i64) -> Result<Self, SessionDomainError> {
        let delta = TimeDelta::try_hours(hours).ok_or(SessionDomainError::TtlOutOfRange(hours))?;
        Self::new(delta)
    }

    /// Creates a lifetime from an arbitrary duration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NonPositiveTtl`] when the duration is not
    /// strictly positive.
    pub fn new(delta: TimeDelta) -> Result<Self, SessionDomainError> {
        if delta <= TimeDelta::zero() {
            return Err(SessionDomainError::NonPositiveTtl(delta.num_seconds()));
        }
        Ok(Self(delta))
    }

    /// Returns the wrapped duration.
    #[must_use]
    pub const fn as_delta(self) -> TimeDelta {
        self.0
    }
}

/// Origin metadata captured when a visitor first makes contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Remote address reported by the boundary layer.
    pub ip_address: Option<String>,
    /// Raw user-agent header.
    pub user_agent: Option<String>,
    /// Free-form browser details supplied by the chat widget.
    #[serde(default)]
    pub browser_info: BTreeMap<String, Value>,
}

impl SessionMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote address.
    #[must_use]
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Adds one browser detail.
    #[must_use]
    pub fn with_browser_info(mut self, key: impl Into<String>, value: Value) -> Self {
        self.browser_info.insert(key.into(), value);
        self
    }
}

/// Identity of an anonymous visitor.
///
/// A session is usable while `now < expires_at`. Expiry is only ever pushed
/// forward by [`GuestSession::extend`]; sessions are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSession {
    token: SessionToken,
    metadata: SessionMetadata,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSessionData {
    /// Persisted session token.
    pub token: SessionToken,
    /// Persisted origin metadata.
    pub metadata: SessionMetadata,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted expiry timestamp.
    pub expires_at: DateTime<Utc>,
}

impl GuestSession {
    /// Creates a fresh session expiring `ttl` from now.
    #[must_use]
    pub fn new(metadata: SessionMetadata, ttl: SessionTtl, clock: &impl Clock) -> Self {
        let now = clock.utc();
        Self {
            token: SessionToken::new(),
            metadata,
            created_at: now,
            expires_at: now + ttl.as_delta(),
        }
    }

    /// Reconstructs a session from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSessionData) -> Self {
        Self {
            token: data.token,
            metadata: data.metadata,
            created_at: data.created_at,
            expires_at: data.expires_at,
        }
    }

    /// Returns the session token.
    #[must_use]
    pub const fn token(&self) -> SessionToken {
        self.token
    }

    /// Returns the origin metadata.
    #[must_use]
    pub const fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns `true` once `now` has reached the expiry timestamp.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` when the session has expired according to `clock`.
    #[must_use]
    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        self.is_expired_at(clock.utc())
    }

    /// Resets expiry to `ttl` from now.
    pub fn extend(&mut self, ttl: SessionTtl, clock: &impl Clock) {
        self.expires_at = clock.utc() + ttl.as_delta();
    }
}
