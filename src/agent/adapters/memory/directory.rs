//! In-memory agent directory preserving registration order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use crate::agent::{
    domain::{Agent, AgentId},
    ports::{AgentDirectory, AgentDirectoryError, AgentDirectoryResult},
};

/// Thread-safe in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentDirectory {
    agents: Arc<RwLock<Vec<Agent>>>,
}

impl InMemoryAgentDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an agent, keeping its original position on replace.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDirectoryError::Backend`] when the lock is poisoned.
    pub fn upsert(&self, agent: Agent) -> AgentDirectoryResult<()> {
        let mut agents = self.agents.write().map_err(poisoned)?;
        if let Some(slot) = agents.iter_mut().find(|existing| existing.id() == agent.id()) {
            *slot = agent;
        } else {
            agents.push(agent);
        }
        Ok(())
    }
}

fn poisoned(err: impl ToString) -> AgentDirectoryError {
    AgentDirectoryError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn find_by_id(&self, id: AgentId) -> AgentDirectoryResult<Option<Agent>> {
        let agents = self.agents.read().map_err(poisoned)?;
        Ok(agents.iter().find(|agent| agent.id() == id).cloned())
    }

    async fn first_available(&self) -> AgentDirectoryResult<Option<Agent>> {
        let agents = self.agents.read().map_err(poisoned)?;
        Ok(agents.iter().find(|agent| agent.is_assignable()).cloned())
    }

    async fn list_all(&self) -> AgentDirectoryResult<Vec<Agent>> {
        let agents = self.agents.read().map_err(poisoned)?;
        Ok(agents.clone())
    }

    async fn list_online(&self) -> AgentDirectoryResult<Vec<Agent>> {
        let agents = self.agents.read().map_err(poisoned)?;
        Ok(agents.iter().filter(|agent| agent.is_online()).cloned().collect())
    }

    async fn touch_last_active(&self, id: AgentId, at: DateTime<Utc>) -> AgentDirectoryResult<()> {
        let mut agents = self.agents.write().map_err(poisoned)?;
        let agent = agents
            .iter_mut()
            .find(|agent| agent.id() == id)
            .ok_or(AgentDirectoryError::NotFound(id))?;
        agent.touch(at);
        Ok(())
    }
}
