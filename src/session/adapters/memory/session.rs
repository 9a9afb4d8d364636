//! In-memory repository for guest sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::{
    domain::{GuestSession, SessionToken},
    ports::{GuestSessionRepository, SessionRepositoryError, SessionRepositoryResult},
};

/// Thread-safe in-memory session repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<SessionToken, GuestSession>>>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> SessionRepositoryError {
    SessionRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl GuestSessionRepository for InMemorySessionRepository {
    async fn store(&self, session: &GuestSession) -> SessionRepositoryResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if sessions.contains_key(&session.token()) {
            return Err(SessionRepositoryError::DuplicateToken(session.token()));
        }
        sessions.insert(session.token(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &GuestSession) -> SessionRepositoryResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let slot = sessions
            .get_mut(&session.token())
            .ok_or(SessionRepositoryError::NotFound(session.token()))?;
        *slot = session.clone();
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: SessionToken,
    ) -> SessionRepositoryResult<Option<GuestSession>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(&token).cloned())
    }
}
