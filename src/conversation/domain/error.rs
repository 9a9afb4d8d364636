//! Error types for conversation domain rules.

use super::{ConversationId, ConversationStatus, MessageId};
use thiserror::Error;

/// Broad classification used by callers to react to domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainErrorCategory {
    /// Bad input shape or length.
    Validation,
    /// The requested change violates the status graph.
    Conflict,
    /// The actor may not perform the change.
    Forbidden,
}

/// Errors raised by conversation and message rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationDomainError {
    /// Message content is empty or whitespace-only.
    #[error("message content must not be empty")]
    EmptyContent,

    /// Message content exceeds the configured limit.
    #[error("message content has {actual} characters, limit is {max}")]
    ContentTooLong {
        /// Characters in the rejected content.
        actual: usize,
        /// Configured maximum.
        max: usize,
    },

    /// More attachment descriptors than one message may carry.
    #[error("message has {actual} attachments, limit is {max}")]
    TooManyAttachments {
        /// Descriptors on the rejected message.
        actual: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The subject line is empty after trimming.
    #[error("subject must not be empty")]
    EmptySubject,

    /// A tag is empty after trimming.
    #[error("tags must not be empty")]
    EmptyTag,

    /// The status graph has no edge between the two statuses.
    #[error("conversation {conversation_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The conversation being changed.
        conversation_id: ConversationId,
        /// Current status.
        from: ConversationStatus,
        /// Requested status.
        to: ConversationStatus,
    },

    /// The conversation is closed or archived and accepts no visible messages.
    #[error("conversation {conversation_id} is {status} and accepts only internal notes")]
    ConversationClosed {
        /// The closed conversation.
        conversation_id: ConversationId,
        /// Its terminal status.
        status: ConversationStatus,
    },

    /// Only the author of a message may edit it.
    #[error("message {0} may only be edited by its author")]
    NotMessageAuthor(MessageId),
}

impl ConversationDomainError {
    /// Returns the category callers should report.
    #[must_use]
    pub const fn category(&self) -> DomainErrorCategory {
        match self {
            Self::EmptyContent
            | Self::ContentTooLong { .. }
            | Self::TooManyAttachments { .. }
            | Self::EmptySubject
            | Self::EmptyTag => DomainErrorCategory::Validation,
            Self::InvalidTransition { .. } | Self::ConversationClosed { .. } => {
                DomainErrorCategory::Conflict
            }
            Self::NotMessageAuthor(_) => DomainErrorCategory::Forbidden,
        }
    }
}

/// Error returned while parsing conversation statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown conversation status: {0}")]
pub struct ParseStatusError(pub String);

/// Error returned while parsing priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);
