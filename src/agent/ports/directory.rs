//! Directory port for agent lookup and activity tracking.

use crate::agent::domain::{Agent, AgentId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent directory operations.
pub type AgentDirectoryResult<T> = Result<T, AgentDirectoryError>;

/// Read access to the staff directory plus activity updates.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Finds an agent by identifier.
    ///
    /// Returns `None` when the agent is unknown.
    async fn find_by_id(&self, id: AgentId) -> AgentDirectoryResult<Option<Agent>>;

    /// Returns the first agent with status `active` and role `agent`, in
    /// directory order.
    async fn first_available(&self) -> AgentDirectoryResult<Option<Agent>>;

    /// Lists every staff member.
    async fn list_all(&self) -> AgentDirectoryResult<Vec<Agent>>;

    /// Lists staff members currently connected.
    async fn list_online(&self) -> AgentDirectoryResult<Vec<Agent>>;

    /// Records that the agent was active at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::NotFound`] when the agent is unknown.
    async fn touch_last_active(&self, id: AgentId, at: DateTime<Utc>) -> AgentDirectoryResult<()>;
}

/// Errors returned by agent directory implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentDirectoryError {
    /// The agent was not found.
    #[error("agent not found: {0}")]
    NotFound(AgentId),

    /// Directory backend failure.
    #[error("directory error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentDirectoryError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
