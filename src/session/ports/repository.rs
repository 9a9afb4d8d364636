//! Repository port for guest session persistence.

use crate::session::domain::{GuestSession, SessionToken};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for session repository operations.
pub type SessionRepositoryResult<T> = Result<T, SessionRepositoryError>;

/// Guest session persistence contract.
#[async_trait]
pub trait GuestSessionRepository: Send + Sync {
    /// Stores a newly created session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionRepositoryError::DuplicateToken`] when the token is
    /// already present.
    async fn store(&self, session: &GuestSession) -> SessionRepositoryResult<()>;

    /// Persists an updated expiry for an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionRepositoryError::NotFound`] when the session does not
    /// exist.
    async fn update(&self, session: &GuestSession) -> SessionRepositoryResult<()>;

    /// Finds a session by token.
    ///
    /// Returns `None` when the token is unknown.
    async fn find_by_token(
        &self,
        token: SessionToken,
    ) -> SessionRepositoryResult<Option<GuestSession>>;
}

/// Errors returned by session repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SessionRepositoryError {
    /// A session with the same token already exists.
    #[error("duplicate session token: {0}")]
    DuplicateToken(SessionToken),

    /// The session was not found.
    #[error("session not found: {0}")]
    NotFound(SessionToken),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SessionRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
