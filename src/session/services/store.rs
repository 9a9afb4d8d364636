//! Session store: creation, validation and extension of guest sessions.

use crate::session::{
    domain::{GuestSession, SessionMetadata, SessionToken, SessionTtl},
    ports::{GuestSessionRepository, SessionRepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors for session operations.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The token does not identify a known session.
    #[error("session invalid: {0}")]
    Invalid(SessionToken),

    /// The session exists but its expiry has passed.
    #[error("session {token} expired at {expired_at}")]
    Expired {
        /// The expired session token.
        token: SessionToken,
        /// The recorded expiry timestamp.
        expired_at: DateTime<Utc>,
    },

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] SessionRepositoryError),
}

/// Result type for session store operations.
pub type SessionStoreResult<T> = Result<T, SessionStoreError>;

/// Guest session orchestration service.
#[derive(Clone)]
pub struct SessionStore<R, C>
where
    R: GuestSessionRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    ttl: SessionTtl,
}

impl<R, C> SessionStore<R, C>
where
    R: GuestSessionRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new session store.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>, ttl: SessionTtl) -> Self {
        Self {
            repository,
            clock,
            ttl,
        }
    }

    /// Returns the configured session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> SessionTtl {
        self.ttl
    }

    /// Creates and persists a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Repository`] when persistence fails.
    pub async fn create_session(&self, metadata: SessionMetadata) -> SessionStoreResult<GuestSession> {
        let session = GuestSession::new(metadata, self.ttl, &*self.clock);
        self.repository.store(&session).await?;
        info!(token = %session.token(), expires_at = %session.expires_at(), "guest session created");
        Ok(session)
    }

    /// Returns `true` when the session has expired.
    #[must_use]
    pub fn is_expired(&self, session: &GuestSession) -> bool {
        session.is_expired(&*self.clock)
    }

    /// Loads a session and checks that it is still usable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Invalid`] for unknown tokens and
    /// [`SessionStoreError::Expired`] once the session has passed its expiry.
    pub async fn validate(&self, token: SessionToken) -> SessionStoreResult<GuestSession> {
        let session = self
            .repository
            .find_by_token(token)
            .await?
            .ok_or(SessionStoreError::Invalid(token))?;
        if self.is_expired(&session) {
            debug!(%token, "rejected expired guest session");
            return Err(SessionStoreError::Expired {
                token,
                expired_at: session.expires_at(),
            });
        }
        Ok(session)
    }

    /// Pushes the session expiry forward by the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Repository`] when the update cannot be
    /// persisted.
    pub async fn extend(&self, session: &mut GuestSession) -> SessionStoreResult<()> {
        session.extend(self.ttl, &*self.clock);
        self.repository.update(session).await?;
        Ok(())
    }

    /// Validates a session and extends it in one step.
    ///
    /// This is the entry check for every inbound guest action.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Self::validate`] and [`Self::extend`].
    pub async fn touch(&self, token: SessionToken) -> SessionStoreResult<GuestSession> {
        let mut session = self.validate(token).await?;
        self.extend(&mut session).await?;
        Ok(session)
    }

    /// Finds a session regardless of expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Repository`] when lookup fails.
    pub async fn find(&self, token: SessionToken) -> SessionStoreResult<Option<GuestSession>> {
        Ok(self.repository.find_by_token(token).await?)
    }
}
