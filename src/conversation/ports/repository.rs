//! Repository port for conversations, their messages and close metrics.
//!
//! Implementations own the atomicity guarantees the registry relies on:
//! reference sequences are handed out once per year, a message append and the
//! conversation counter change commit together, and a close commits the
//! status, the metric and the closing message as one unit.

use crate::agent::domain::AgentId;
use crate::conversation::domain::{
    Conversation, ConversationId, ConversationMetric, ConversationStats, ConversationStatus,
    Message, MessageId, Priority,
};
use crate::session::domain::SessionToken;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Result type for conversation repository operations.
pub type ConversationRepositoryResult<T> = Result<T, ConversationRepositoryError>;

/// Filter for conversation listings. Empty sets match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationQuery {
    /// Statuses to include.
    pub statuses: BTreeSet<ConversationStatus>,
    /// Priorities to include.
    pub priorities: BTreeSet<Priority>,
    /// Restrict to one assigned agent.
    pub assigned_agent: Option<AgentId>,
    /// Restrict to one owning session.
    pub session_token: Option<SessionToken>,
    /// Case-insensitive substring of the reference.
    pub reference_contains: Option<String>,
}

impl ConversationQuery {
    /// Matches conversations in any of `statuses`.
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ConversationStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Matches conversations with any of `priorities`.
    #[must_use]
    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = Priority>) -> Self {
        self.priorities = priorities.into_iter().collect();
        self
    }

    /// Matches conversations assigned to `agent_id`.
    #[must_use]
    pub const fn with_assigned_agent(mut self, agent_id: AgentId) -> Self {
        self.assigned_agent = Some(agent_id);
        self
    }

    /// Matches conversations owned by `token`.
    #[must_use]
    pub const fn with_session(mut self, token: SessionToken) -> Self {
        self.session_token = Some(token);
        self
    }

    /// Matches references containing `needle`, ignoring case.
    #[must_use]
    pub fn with_reference_containing(mut self, needle: impl Into<String>) -> Self {
        self.reference_contains = Some(needle.into());
        self
    }

    /// Returns `true` when `conversation` satisfies every filter.
    #[must_use]
    pub fn matches(&self, conversation: &Conversation) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&conversation.status()) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&conversation.priority()) {
            return false;
        }
        if self
            .assigned_agent
            .is_some_and(|agent| conversation.assigned_agent() != Some(agent))
        {
            return false;
        }
        if self
            .session_token
            .is_some_and(|token| conversation.session_token() != token)
        {
            return false;
        }
        self.reference_contains.as_deref().is_none_or(|needle| {
            conversation
                .reference_id()
                .as_str()
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}

/// Conversation persistence contract.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns the next reference sequence for `year`, starting at 1.
    ///
    /// Concurrent callers never receive the same value.
    async fn next_reference_sequence(&self, year: i32) -> ConversationRepositoryResult<u32>;

    /// Stores a newly opened conversation.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationRepositoryError::Duplicate`] when the identifier
    /// is already present.
    async fn insert(&self, conversation: &Conversation) -> ConversationRepositoryResult<()>;

    /// Replaces the stored conversation row.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationRepositoryError::NotFound`] when the conversation
    /// does not exist.
    async fn update(&self, conversation: &Conversation) -> ConversationRepositoryResult<()>;

    /// Finds a conversation by identifier.
    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> ConversationRepositoryResult<Option<Conversation>>;

    /// Lists conversations matching `query`, in no particular order.
    async fn list(&self, query: &ConversationQuery) -> ConversationRepositoryResult<Vec<Conversation>>;

    /// Stores `message` and the conversation row carrying the new counter as
    /// one unit.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationRepositoryError::NotFound`] when the conversation
    /// does not exist or [`ConversationRepositoryError::DuplicateMessage`]
    /// when the message identifier is taken.
    async fn append_message(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> ConversationRepositoryResult<()>;

    /// Replaces a stored message.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationRepositoryError::MessageNotFound`] when the
    /// message does not exist.
    async fn update_message(&self, message: &Message) -> ConversationRepositoryResult<()>;

    /// Returns every message of a conversation in sequence order.
    async fn messages(&self, id: ConversationId) -> ConversationRepositoryResult<Vec<Message>>;

    /// Finds a message by identifier.
    async fn find_message(&self, id: MessageId) -> ConversationRepositoryResult<Option<Message>>;

    /// Commits a close: the conversation row, its metric and the closing
    /// message.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationRepositoryError::MetricAlreadyRecorded`] when the
    /// conversation already has a metric. Nothing is written in that case.
    async fn commit_close(
        &self,
        conversation: &Conversation,
        metric: &ConversationMetric,
        closing_message: &Message,
    ) -> ConversationRepositoryResult<()>;

    /// Finds the close metric of a conversation.
    async fn find_metric(
        &self,
        id: ConversationId,
    ) -> ConversationRepositoryResult<Option<ConversationMetric>>;

    /// Counts guest messages in a conversation that nobody has read.
    async fn unread_guest_count(&self, id: ConversationId) -> ConversationRepositoryResult<u64>;

    /// Aggregates counts across every conversation.
    async fn stats(&self) -> ConversationRepositoryResult<ConversationStats>;
}

/// Errors returned by conversation repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ConversationRepositoryError {
    /// A conversation with the same identifier already exists.
    #[error("duplicate conversation: {0}")]
    Duplicate(ConversationId),

    /// The conversation was not found.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// A message with the same identifier already exists.
    #[error("duplicate message: {0}")]
    DuplicateMessage(MessageId),

    /// The message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// A metric was already recorded for the conversation.
    #[error("metric already recorded for conversation {0}")]
    MetricAlreadyRecorded(ConversationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConversationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
