//! Error types for agent domain values.

use thiserror::Error;

/// Errors returned while constructing agents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentDomainError {
    /// The display name is empty after trimming.
    #[error("agent name must not be empty")]
    EmptyName,
}

/// Error returned while parsing agent roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent role: {0}")]
pub struct ParseAgentRoleError(pub String);

/// Error returned while parsing agent availability statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent status: {0}")]
pub struct ParseAgentStatusError(pub String);
