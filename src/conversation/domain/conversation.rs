//! Conversation aggregate root and its status transitions.

use super::{
    ConversationDomainError, ConversationId, ConversationStatus, Priority, ReferenceId,
    SequenceNumber,
};
use crate::agent::domain::AgentId;
use crate::session::domain::SessionToken;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of an assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Already assigned to the same agent and active; nothing changed.
    Unchanged,
    /// Assignment or status changed.
    Assigned {
        /// Status before the assignment.
        previous_status: ConversationStatus,
        /// Agent assigned before, if any.
        previous_agent: Option<AgentId>,
    },
}

/// A single support thread owned by one guest session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    reference_id: ReferenceId,
    session_token: SessionToken,
    assigned_agent: Option<AgentId>,
    status: ConversationStatus,
    priority: Priority,
    subject: Option<String>,
    tags: BTreeSet<String>,
    message_count: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    first_message_at: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
    assigned_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedConversationData {
    /// Persisted identifier.
    pub id: ConversationId,
    /// Persisted reference.
    pub reference_id: ReferenceId,
    /// Owning session.
    pub session_token: SessionToken,
    /// Assigned agent, if any.
    pub assigned_agent: Option<AgentId>,
    /// Persisted status.
    pub status: ConversationStatus,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted subject.
    pub subject: Option<String>,
    /// Persisted tags.
    pub tags: BTreeSet<String>,
    /// Persisted message counter.
    pub message_count: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Timestamp of the first message.
    pub first_message_at: DateTime<Utc>,
    /// Timestamp of the latest message.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Timestamp of the latest assignment.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Timestamp of closing.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Opens an active, normal-priority conversation for a session.
    #[must_use]
    pub fn open(reference_id: ReferenceId, session_token: SessionToken, clock: &impl Clock) -> Self {
        let now = clock.utc();
        Self {
            id: ConversationId::new(),
            reference_id,
            session_token,
            assigned_agent: None,
            status: ConversationStatus::Active,
            priority: Priority::Normal,
            subject: None,
            tags: BTreeSet::new(),
            message_count: 0,
            created_at: now,
            updated_at: now,
            first_message_at: now,
            last_message_at: None,
            assigned_at: None,
            closed_at: None,
        }
    }

    /// Reconstructs a conversation from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedConversationData) -> Self {
        Self {
            id: data.id,
            reference_id: data.reference_id,
            session_token: data.session_token,
            assigned_agent: data.assigned_agent,
            status: data.status,
            priority: data.priority,
            subject: data.subject,
            tags: data.tags,
            message_count: data.message_count,
            created_at: data.created_at,
            updated_at: data.updated_at,
            first_message_at: data.first_message_at,
            last_message_at: data.last_message_at,
            assigned_at: data.assigned_at,
            closed_at: data.closed_at,
        }
    }

    /// Returns the internal identifier.
    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Returns the human-readable reference.
    #[must_use]
    pub const fn reference_id(&self) -> &ReferenceId {
        &self.reference_id
    }

    /// Returns the owning session token.
    #[must_use]
    pub const fn session_token(&self) -> SessionToken {
        self.session_token
    }

    /// Returns the assigned agent, if any.
    #[must_use]
    pub const fn assigned_agent(&self) -> Option<AgentId> {
        self.assigned_agent
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> ConversationStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the subject, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the number of messages appended so far.
    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the timestamp of the first message.
    #[must_use]
    pub const fn first_message_at(&self) -> DateTime<Utc> {
        self.first_message_at
    }

    /// Returns the timestamp of the latest message.
    #[must_use]
    pub const fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    /// Returns the timestamp of the latest assignment.
    #[must_use]
    pub const fn assigned_at(&self) -> Option<DateTime<Utc>> {
        self.assigned_at
    }

    /// Returns the closing timestamp.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Checks whether a message may be appended in the current status.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationDomainError::ConversationClosed`] for visible
    /// messages on closed or archived conversations.
    pub const fn ensure_accepts(&self, is_internal_note: bool) -> Result<(), ConversationDomainError> {
        if self.status.is_terminal() && !is_internal_note {
            return Err(ConversationDomainError::ConversationClosed {
                conversation_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Counts a newly appended message and returns its sequence number.
    ///
    /// Counter and `last_message_at` change together.
    pub fn record_message(&mut self, at: DateTime<Utc>) -> SequenceNumber {
        self.message_count = self.message_count.saturating_add(1);
        self.last_message_at = Some(at);
        self.updated_at = at;
        SequenceNumber::new(self.message_count)
    }

    /// Moves along one edge of the status graph.
    ///
    /// Closing stamps `closed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationDomainError::InvalidTransition`] when the graph
    /// has no edge from the current status to `next`.
    pub fn transition_to(
        &mut self,
        next: ConversationStatus,
        clock: &impl Clock,
    ) -> Result<ConversationStatus, ConversationDomainError> {
        if !self.status.can_transition_to(next) {
            return Err(ConversationDomainError::InvalidTransition {
                conversation_id: self.id,
                from: self.status,
                to: next,
            });
        }
        let previous = self.status;
        let now = clock.utc();
        self.status = next;
        if next == ConversationStatus::Closed {
            self.closed_at = Some(now);
        }
        self.updated_at = now;
        Ok(previous)
    }

    /// Assigns an agent and makes the conversation active.
    ///
    /// Idempotent when the same agent already holds an active conversation.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationDomainError::InvalidTransition`] for closed or
    /// archived conversations.
    pub fn assign(
        &mut self,
        agent_id: AgentId,
        clock: &impl Clock,
    ) -> Result<AssignOutcome, ConversationDomainError> {
        if self.status.is_terminal() {
            return Err(ConversationDomainError::InvalidTransition {
                conversation_id: self.id,
                from: self.status,
                to: ConversationStatus::Active,
            });
        }
        if self.assigned_agent == Some(agent_id) && self.status == ConversationStatus::Active {
            return Ok(AssignOutcome::Unchanged);
        }

        let previous_status = self.status;
        let previous_agent = self.assigned_agent;
        let now = clock.utc();
        if previous_agent != Some(agent_id) {
            self.assigned_agent = Some(agent_id);
            self.assigned_at = Some(now);
        }
        self.status = ConversationStatus::Active;
        self.updated_at = now;
        Ok(AssignOutcome::Assigned {
            previous_status,
            previous_agent,
        })
    }

    /// Sets the priority. Returns `true` when it changed.
    pub fn set_priority(&mut self, priority: Priority, clock: &impl Clock) -> bool {
        if self.priority == priority {
            return false;
        }
        self.priority = priority;
        self.updated_at = clock.utc();
        true
    }

    /// Replaces the tag set. Returns `true` when it changed.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationDomainError::EmptyTag`] when any tag is blank.
    pub fn set_tags(
        &mut self,
        tags: impl IntoIterator<Item = String>,
        clock: &impl Clock,
    ) -> Result<bool, ConversationDomainError> {
        let mut normalized = BTreeSet::new();
        for tag in tags {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                return Err(ConversationDomainError::EmptyTag);
            }
            normalized.insert(trimmed.to_owned());
        }
        if normalized == self.tags {
            return Ok(false);
        }
        self.tags = normalized;
        self.updated_at = clock.utc();
        Ok(true)
    }

    /// Sets the trimmed subject line. Returns `true` when it changed.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationDomainError::EmptySubject`] for a blank subject.
    pub fn set_subject(
        &mut self,
        subject: &str,
        clock: &impl Clock,
    ) -> Result<bool, ConversationDomainError> {
        let trimmed = subject.trim();
        if trimmed.is_empty() {
            return Err(ConversationDomainError::EmptySubject);
        }
        if self.subject.as_deref() == Some(trimmed) {
            return Ok(false);
        }
        self.subject = Some(trimmed.to_owned());
        self.updated_at = clock.utc();
        Ok(true)
    }
}

/// Aggregate counts across every conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Conversations per status; absent statuses count as zero.
    pub by_status: BTreeMap<String, u64>,
    /// Messages across every conversation.
    pub total_messages: u64,
    /// Guest messages nobody has read yet.
    pub unread_guest_messages: u64,
}

impl ConversationStats {
    /// Returns the number of conversations in `status`.
    #[must_use]
    pub fn count(&self, status: ConversationStatus) -> u64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    /// Returns the number of conversations in any status.
    #[must_use]
    pub fn total_conversations(&self) -> u64 {
        self.by_status.values().sum()
    }
}
