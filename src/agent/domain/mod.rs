//! Domain model for support agents.

mod agent;
mod error;

pub use agent::{Agent, AgentId, AgentRole, AgentStatus};
pub use error::{AgentDomainError, ParseAgentRoleError, ParseAgentStatusError};
