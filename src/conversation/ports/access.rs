//! Authorization port for agent-channel operations.

use crate::agent::domain::Agent;
use crate::conversation::domain::Conversation;
use std::fmt;

/// Operations an agent can attempt on a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationAction {
    /// Read the conversation and its history.
    View,
    /// Assign the conversation to an agent.
    Assign,
    /// Post a message or internal note.
    Respond,
    /// Close the conversation.
    Close,
    /// Change status, priority or tags.
    Update,
}

impl ConversationAction {
    /// Returns the action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Assign => "assign",
            Self::Respond => "respond",
            Self::Close => "close",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for ConversationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether an agent may act on a conversation.
#[cfg_attr(test, mockall::automock)]
pub trait ConversationAccessPolicy: Send + Sync {
    /// Returns `true` when `agent` may perform `action` on `conversation`.
    fn permits(&self, agent: &Agent, action: ConversationAction, conversation: &Conversation)
    -> bool;
}
