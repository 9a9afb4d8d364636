//! Boundary error taxonomy for the guest and agent channels.

use crate::agent::{domain::AgentId, ports::AgentDirectoryError};
use crate::broadcast::HubError;
use crate::config::ConfigError;
use crate::conversation::{
    domain::ConversationId,
    ports::{ConversationAction, ConversationRepositoryError},
    services::RegistryError,
};
use crate::routing::RoutingError;
use crate::session::{
    domain::SessionToken, ports::SessionRepositoryError, services::SessionStoreError,
};
use std::fmt;
use thiserror::Error;

/// Coarse error category reported to agent dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input shape or length; not retried.
    Validation,
    /// Unknown session token; the guest must start a new session.
    SessionInvalid,
    /// Session past its expiry; the guest must start a new session.
    SessionExpired,
    /// The change violates the conversation status graph.
    StateConflict,
    /// Unknown conversation, message or agent.
    NotFound,
    /// The acting agent may not perform the change.
    Forbidden,
    /// A backend is down or the desk is shutting down; may be retried.
    Unavailable,
    /// Unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::SessionInvalid => "session_invalid",
            Self::SessionExpired => "session_expired",
            Self::StateConflict => "state_conflict",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`super::SupportDesk`].
#[derive(Debug, Error)]
pub enum DeskError {
    /// Session lookup or persistence failed.
    #[error(transparent)]
    Session(#[from] SessionStoreError),

    /// Conversation operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Agent directory failed.
    #[error(transparent)]
    Directory(#[from] AgentDirectoryError),

    /// The broadcast hub refused a subscription.
    #[error(transparent)]
    Broadcast(#[from] HubError),

    /// The desk configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session has no active or waiting conversation.
    #[error("session {0} has no open conversation")]
    NoOpenConversation(SessionToken),

    /// The acting agent is not in the directory.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The access policy denied the action.
    #[error("agent {agent_id} may not {action} conversation {conversation_id}")]
    Forbidden {
        /// Acting agent.
        agent_id: AgentId,
        /// Denied action.
        action: ConversationAction,
        /// Target conversation.
        conversation_id: ConversationId,
    },
}

impl From<RoutingError> for DeskError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::Session(inner) => Self::Session(inner),
            RoutingError::Registry(inner) => Self::Registry(inner),
        }
    }
}

/// Result type for desk operations.
pub type DeskResult<T> = Result<T, DeskError>;

impl DeskError {
    /// Returns the taxonomy kind for agent-facing reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(err) => session_kind(err),
            Self::Registry(err) => registry_kind(err),
            Self::Directory(AgentDirectoryError::NotFound(_)) | Self::UnknownAgent(_)
            | Self::NoOpenConversation(_) => {
                ErrorKind::NotFound
            }
            Self::Directory(AgentDirectoryError::Backend(_)) | Self::Broadcast(_) => {
                ErrorKind::Unavailable
            }
            Self::Config(_) => ErrorKind::Internal,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }

    /// Returns the message shown to a guest.
    ///
    /// Guests only ever see one of four texts; details stay in the logs.
    #[must_use]
    pub const fn guest_notice(&self) -> &'static str {
        match self.kind() {
            ErrorKind::SessionInvalid => "session invalid",
            ErrorKind::SessionExpired => "session expired",
            ErrorKind::Validation
            | ErrorKind::StateConflict
            | ErrorKind::NotFound
            | ErrorKind::Forbidden => "message rejected",
            ErrorKind::Unavailable | ErrorKind::Internal => "temporarily unavailable",
        }
    }
}

const fn session_kind(err: &SessionStoreError) -> ErrorKind {
    match err {
        SessionStoreError::Invalid(_)
        | SessionStoreError::Repository(SessionRepositoryError::NotFound(_)) => {
            ErrorKind::SessionInvalid
        }
        SessionStoreError::Expired { .. } => ErrorKind::SessionExpired,
        SessionStoreError::Repository(SessionRepositoryError::DuplicateToken(_)) => {
            ErrorKind::Internal
        }
        SessionStoreError::Repository(SessionRepositoryError::Persistence(_)) => {
            ErrorKind::Unavailable
        }
    }
}

const fn registry_kind(err: &RegistryError) -> ErrorKind {
    match err {
        RegistryError::Validation(_) => ErrorKind::Validation,
        RegistryError::StateConflict(_)
        | RegistryError::Repository(ConversationRepositoryError::MetricAlreadyRecorded(_)) => {
            ErrorKind::StateConflict
        }
        RegistryError::Forbidden(_) | RegistryError::NotAdmitted(_) => ErrorKind::Forbidden,
        RegistryError::NotFound(_)
        | RegistryError::MessageNotFound(_)
        | RegistryError::Repository(
            ConversationRepositoryError::NotFound(_)
            | ConversationRepositoryError::MessageNotFound(_),
        ) => ErrorKind::NotFound,
        RegistryError::ShuttingDown
        | RegistryError::Repository(ConversationRepositoryError::Persistence(_)) => {
            ErrorKind::Unavailable
        }
        RegistryError::Repository(
            ConversationRepositoryError::Duplicate(_)
            | ConversationRepositoryError::DuplicateMessage(_),
        ) => ErrorKind::Internal,
    }
}
