//! Agent identity, role and availability.

use super::{AgentDomainError, ParseAgentRoleError, ParseAgentStatusError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a support agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Creates a new random agent identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an agent identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Staff role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Front-line support agent.
    Agent,
    /// Supervisor able to assign and update any conversation.
    Admin,
    /// Unrestricted administrator.
    SuperAdmin,
}

impl AgentRole {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Returns `true` for the admin and super admin roles.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentRole {
    type Error = ParseAgentRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(ParseAgentRoleError(value.to_owned())),
        }
    }
}

/// Availability of an agent for new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Available to take conversations.
    Active,
    /// Signed in but not accepting new conversations.
    Busy,
    /// Not working.
    Inactive,
}

impl AgentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Busy => "busy",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentStatus {
    type Error = ParseAgentStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "busy" => Ok(Self::Busy),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseAgentStatusError(value.to_owned())),
        }
    }
}

/// A staff member who can be assigned conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    name: String,
    role: AgentRole,
    status: AgentStatus,
    is_online: bool,
    last_active_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Creates an online, active agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentDomainError::EmptyName`] when `name` is blank.
    pub fn new(name: impl Into<String>, role: AgentRole) -> Result<Self, AgentDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AgentDomainError::EmptyName);
        }
        Ok(Self {
            id: AgentId::new(),
            name: trimmed.to_owned(),
            role,
            status: AgentStatus::Active,
            is_online: true,
            last_active_at: None,
        })
    }

    /// Sets the availability status.
    #[must_use]
    pub const fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets whether the agent is connected to the dashboard.
    #[must_use]
    pub const fn with_online(mut self, is_online: bool) -> Self {
        self.is_online = is_online;
        self
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the staff role.
    #[must_use]
    pub const fn role(&self) -> AgentRole {
        self.role
    }

    /// Returns the availability status.
    #[must_use]
    pub const fn status(&self) -> AgentStatus {
        self.status
    }

    /// Returns `true` while the agent is connected.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.is_online
    }

    /// Returns when the agent last sent a message.
    #[must_use]
    pub const fn last_active_at(&self) -> Option<DateTime<Utc>> {
        self.last_active_at
    }

    /// Returns `true` when the agent can be picked for auto-assignment.
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        self.status == AgentStatus::Active && self.role == AgentRole::Agent
    }

    /// Records agent activity.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_active_at = Some(at);
    }
}
