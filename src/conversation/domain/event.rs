//! Events published after conversation changes are committed.

use super::{Conversation, ConversationId, ConversationStatus, Message, Priority, ReferenceId};
use crate::agent::domain::AgentId;
use crate::session::domain::SessionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Channel families that listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EventChannel {
    /// Dashboard-wide feed of every conversation change.
    Admin,
    /// Feed scoped to one conversation.
    Conversation(ConversationId),
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin.conversations"),
            Self::Conversation(id) => write!(f, "conversation.{id}"),
        }
    }
}

/// Conversation attributes a dashboard needs to re-render a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Internal identifier.
    pub id: ConversationId,
    /// Human-readable reference.
    pub reference_id: ReferenceId,
    /// Owning session.
    pub session_token: SessionToken,
    /// Current status.
    pub status: ConversationStatus,
    /// Current priority.
    pub priority: Priority,
    /// Assigned agent, if any.
    pub assigned_agent: Option<AgentId>,
    /// Subject line, if any.
    pub subject: Option<String>,
    /// Tags.
    pub tags: BTreeSet<String>,
    /// Messages appended so far.
    pub message_count: u64,
    /// Timestamp of the latest message.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Timestamp of the latest assignment.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Timestamp of closing.
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id(),
            reference_id: conversation.reference_id().clone(),
            session_token: conversation.session_token(),
            status: conversation.status(),
            priority: conversation.priority(),
            assigned_agent: conversation.assigned_agent(),
            subject: conversation.subject().map(ToOwned::to_owned),
            tags: conversation.tags().clone(),
            message_count: conversation.message_count(),
            last_message_at: conversation.last_message_at(),
            assigned_at: conversation.assigned_at(),
            closed_at: conversation.closed_at(),
        }
    }
}

/// Committed change broadcast to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ConversationEvent {
    /// Status, assignment, priority or tags changed, or the conversation was
    /// just opened (no previous status).
    #[serde(rename = "conversation.status.changed")]
    StatusChanged {
        /// Conversation after the change.
        conversation: ConversationSummary,
        /// Status before the change.
        previous_status: Option<ConversationStatus>,
    },
    /// A message was appended.
    #[serde(rename = "message.sent")]
    MessageSent {
        /// The appended message.
        message: Message,
    },
    /// A message was edited or marked read.
    #[serde(rename = "message.updated")]
    MessageUpdated {
        /// The message after the change.
        message: Message,
    },
}

impl ConversationEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "conversation.status.changed",
            Self::MessageSent { .. } => "message.sent",
            Self::MessageUpdated { .. } => "message.updated",
        }
    }

    /// Returns the conversation the event concerns.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::StatusChanged { conversation, .. } => conversation.id,
            Self::MessageSent { message } | Self::MessageUpdated { message } => {
                message.conversation_id()
            }
        }
    }
}
