//! Conversation registry: lifecycle, ordering and assignment.
//!
//! Every mutation of a conversation runs under that conversation's lock and
//! publishes its events after the repository commit, before the lock is
//! released. Subscribers of one conversation therefore see its events in
//! commit order.

use super::locks::{KeyGuard, LockTable};
use crate::agent::domain::{Agent, AgentId};
use crate::conversation::{
    domain::{
        AssignOutcome, Conversation, ConversationDomainError, ConversationEvent, ConversationId,
        ConversationMetric, ConversationStats, ConversationStatus, DomainErrorCategory,
        EventChannel, Message, MessageDraft, MessageId, MessageKind, Priority, ReferenceId, Sender,
        validate_content,
    },
    ports::{
        ConversationEventSink, ConversationQuery, ConversationRepository,
        ConversationRepositoryError,
    },
};
use crate::session::domain::SessionToken;
use chrono::Datelike;
use mockable::Clock;
use std::cmp::Reverse;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors for conversation operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Input rejected before any state changed.
    #[error(transparent)]
    Validation(ConversationDomainError),

    /// The change violates the status graph.
    #[error(transparent)]
    StateConflict(ConversationDomainError),

    /// The actor may not perform the change.
    #[error(transparent)]
    Forbidden(ConversationDomainError),

    /// A [`ConversationGate`] turned the change down.
    #[error("change to conversation {0} was not admitted")]
    NotAdmitted(ConversationId),

    /// The conversation does not exist.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// The message does not exist in the conversation.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// The registry no longer accepts mutations.
    #[error("conversation registry is shutting down")]
    ShuttingDown,

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ConversationRepositoryError),
}

impl From<ConversationDomainError> for RegistryError {
    fn from(err: ConversationDomainError) -> Self {
        match err.category() {
            DomainErrorCategory::Validation => Self::Validation(err),
            DomainErrorCategory::Conflict => Self::StateConflict(err),
            DomainErrorCategory::Forbidden => Self::Forbidden(err),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Precondition evaluated on the current conversation while its lock is
/// held, before a gated change is applied.
pub trait ConversationGate: Send + Sync {
    /// Returns `true` when the change may proceed.
    fn admits(&self, conversation: &Conversation) -> bool;
}

/// Gate that admits every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ungated;

impl ConversationGate for Ungated {
    fn admits(&self, _conversation: &Conversation) -> bool {
        true
    }
}

/// Tunables for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Prefix of generated reference identifiers.
    pub reference_prefix: String,
    /// Maximum message length in characters.
    pub max_message_chars: usize,
    /// Text of the message appended when a conversation closes.
    pub closing_message: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            reference_prefix: "CHAT".to_owned(),
            max_message_chars: 1000,
            closing_message: "This conversation has been closed. Thank you for contacting us!"
                .to_owned(),
        }
    }
}

/// Staff member performing a change that authors a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Acting agent.
    pub agent_id: AgentId,
    /// Name shown on messages they author.
    pub display_name: String,
}

impl From<&Agent> for Actor {
    fn from(agent: &Agent) -> Self {
        Self {
            agent_id: agent.id(),
            display_name: agent.name().to_owned(),
        }
    }
}

/// Manual edits applied by [`ConversationRegistry::update_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Target status; must be reachable along the status graph.
    pub status: Option<ConversationStatus>,
    /// New priority.
    pub priority: Option<Priority>,
    /// Replacement tag set.
    pub tags: Option<Vec<String>>,
    /// New subject line.
    pub subject: Option<String>,
}

/// Everything a close committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedConversation {
    /// The conversation after closing.
    pub conversation: Conversation,
    /// The metric snapshot taken before the closing message.
    pub metric: ConversationMetric,
    /// The closing message authored by the actor.
    pub closing_message: Message,
}

/// A listing row with its unread guest message count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationListing {
    /// The conversation.
    pub conversation: Conversation,
    /// Guest messages nobody has read.
    pub unread_guest_messages: u64,
}

/// Owner of conversation state and the status graph.
pub struct ConversationRegistry<R, C>
where
    R: ConversationRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    events: Arc<dyn ConversationEventSink>,
    config: RegistryConfig,
    conversation_locks: LockTable<ConversationId>,
    session_locks: LockTable<SessionToken>,
}

impl<R, C> ConversationRegistry<R, C>
where
    R: ConversationRepository,
    C: Clock + Send + Sync,
{
    /// Creates a registry publishing to `events`.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        clock: Arc<C>,
        events: Arc<dyn ConversationEventSink>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            events,
            config,
            conversation_locks: LockTable::new(),
            session_locks: LockTable::new(),
        }
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the session's open (active or waiting) conversation, creating
    /// an active one when there is none.
    ///
    /// Creation is serialised per session, so one session never owns two open
    /// conversations.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ShuttingDown`] after shutdown and
    /// [`RegistryError::Repository`] when persistence fails.
    pub async fn get_or_create(&self, token: SessionToken) -> RegistryResult<Conversation> {
        let _session = self
            .session_locks
            .acquire(token)
            .await
            .ok_or(RegistryError::ShuttingDown)?;
        if let Some(existing) = self.find_open_for_session(token).await? {
            return Ok(existing);
        }

        let year = self.clock.utc().year();
        let sequence = self.repository.next_reference_sequence(year).await?;
        let reference_id = ReferenceId::new(&self.config.reference_prefix, year, sequence);
        let conversation = Conversation::open(reference_id, token, &*self.clock);
        self.repository.insert(&conversation).await?;
        info!(
            conversation_id = %conversation.id(),
            reference_id = %conversation.reference_id(),
            session = %token,
            "conversation opened"
        );
        self.publish_status(&conversation, None);
        Ok(conversation)
    }

    /// Returns the session's conversation with status `active`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn find_active_for_session(
        &self,
        token: SessionToken,
    ) -> RegistryResult<Option<Conversation>> {
        self.latest_for_session(token, [ConversationStatus::Active])
            .await
    }

    /// Returns the session's active or waiting conversation, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn find_open_for_session(
        &self,
        token: SessionToken,
    ) -> RegistryResult<Option<Conversation>> {
        self.latest_for_session(token, [ConversationStatus::Active, ConversationStatus::Waiting])
            .await
    }

    async fn latest_for_session(
        &self,
        token: SessionToken,
        statuses: impl IntoIterator<Item = ConversationStatus>,
    ) -> RegistryResult<Option<Conversation>> {
        let query = ConversationQuery::default()
            .with_session(token)
            .with_statuses(statuses);
        let conversations = self.repository.list(&query).await?;
        Ok(conversations
            .into_iter()
            .max_by_key(Conversation::created_at))
    }

    /// Appends a message and bumps the conversation counter in one commit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for empty or over-long content,
    /// [`RegistryError::StateConflict`] for visible messages on closed or
    /// archived conversations and [`RegistryError::NotFound`] for unknown
    /// conversations.
    pub async fn append_message(
        &self,
        conversation_id: ConversationId,
        draft: MessageDraft,
    ) -> RegistryResult<Message> {
        self.append_message_gated(conversation_id, draft, &Ungated)
            .await
    }

    /// [`Self::append_message`] behind `gate`.
    ///
    /// # Errors
    ///
    /// Also returns [`RegistryError::NotAdmitted`] when `gate` refuses.
    pub async fn append_message_gated(
        &self,
        conversation_id: ConversationId,
        draft: MessageDraft,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<Message> {
        validate_content(draft.content(), self.config.max_message_chars)?;
        let _guard = self.lock(conversation_id).await?;
        let mut conversation = self.load_admitted(conversation_id, gate).await?;
        conversation.ensure_accepts(draft.is_internal_note())?;

        let now = self.clock.utc();
        let sequence = conversation.record_message(now);
        let message = draft.into_message(conversation_id, sequence, now);
        self.repository
            .append_message(&conversation, &message)
            .await?;
        debug!(
            %conversation_id,
            %sequence,
            sender = message.sender().kind_str(),
            internal = message.is_internal_note(),
            "message appended"
        );
        self.publish_message(ConversationEvent::MessageSent {
            message: message.clone(),
        });
        Ok(message)
    }

    /// Moves an active conversation to `waiting`. Already-waiting
    /// conversations are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StateConflict`] for closed or archived
    /// conversations and [`RegistryError::NotFound`] for unknown ones.
    pub async fn escalate(&self, conversation_id: ConversationId) -> RegistryResult<Conversation> {
        let _guard = self.lock(conversation_id).await?;
        let mut conversation = self.load(conversation_id).await?;
        if conversation.status() == ConversationStatus::Waiting {
            return Ok(conversation);
        }
        let previous = conversation.transition_to(ConversationStatus::Waiting, &*self.clock)?;
        self.repository.update(&conversation).await?;
        info!(%conversation_id, "conversation escalated to waiting");
        self.publish_status(&conversation, Some(previous));
        Ok(conversation)
    }

    /// Assigns an agent and makes the conversation active.
    ///
    /// Reassigning the same agent to an active conversation is a no-op and
    /// publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StateConflict`] for closed or archived
    /// conversations and [`RegistryError::NotFound`] for unknown ones.
    pub async fn assign(
        &self,
        conversation_id: ConversationId,
        agent_id: AgentId,
    ) -> RegistryResult<Conversation> {
        self.assign_gated(conversation_id, agent_id, &Ungated).await
    }

    /// [`Self::assign`] behind `gate`.
    ///
    /// # Errors
    ///
    /// Also returns [`RegistryError::NotAdmitted`] when `gate` refuses.
    pub async fn assign_gated(
        &self,
        conversation_id: ConversationId,
        agent_id: AgentId,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<Conversation> {
        let _guard = self.lock(conversation_id).await?;
        let mut conversation = self.load_admitted(conversation_id, gate).await?;
        match conversation.assign(agent_id, &*self.clock)? {
            AssignOutcome::Unchanged => {
                debug!(%conversation_id, %agent_id, "assignment unchanged");
            }
            AssignOutcome::Assigned {
                previous_status,
                previous_agent,
            } => {
                self.repository.update(&conversation).await?;
                info!(
                    %conversation_id,
                    %agent_id,
                    previous_agent = ?previous_agent,
                    %previous_status,
                    "conversation assigned"
                );
                self.publish_status(&conversation, Some(previous_status));
            }
        }
        Ok(conversation)
    }

    /// Closes the conversation.
    ///
    /// Computes the metric from the messages so far, then commits the closed
    /// row, the metric and a closing message authored by `actor` together.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StateConflict`] when the conversation is
    /// already closed or archived and [`RegistryError::NotFound`] for unknown
    /// conversations.
    pub async fn close(
        &self,
        conversation_id: ConversationId,
        actor: &Actor,
    ) -> RegistryResult<ClosedConversation> {
        self.close_gated(conversation_id, actor, &Ungated).await
    }

    /// [`Self::close`] behind `gate`.
    ///
    /// # Errors
    ///
    /// Also returns [`RegistryError::NotAdmitted`] when `gate` refuses.
    pub async fn close_gated(
        &self,
        conversation_id: ConversationId,
        actor: &Actor,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<ClosedConversation> {
        let _guard = self.lock(conversation_id).await?;
        let conversation = self.load_admitted(conversation_id, gate).await?;
        self.close_locked(conversation, actor).await
    }

    async fn close_locked(
        &self,
        mut conversation: Conversation,
        actor: &Actor,
    ) -> RegistryResult<ClosedConversation> {
        let previous = conversation.transition_to(ConversationStatus::Closed, &*self.clock)?;
        let messages = self.repository.messages(conversation.id()).await?;
        let now = self.clock.utc();
        let metric = ConversationMetric::compute(conversation.id(), &messages, now);

        let sequence = conversation.record_message(now);
        let closing_message = MessageDraft::agent(
            actor.agent_id,
            actor.display_name.clone(),
            self.config.closing_message.clone(),
        )
        .with_kind(MessageKind::System)
        .into_message(conversation.id(), sequence, now);

        self.repository
            .commit_close(&conversation, &metric, &closing_message)
            .await?;
        info!(
            conversation_id = %conversation.id(),
            closed_by = %actor.agent_id,
            resolution = ?metric.resolution(),
            "conversation closed"
        );
        self.publish_status(&conversation, Some(previous));
        self.publish_message(ConversationEvent::MessageSent {
            message: closing_message.clone(),
        });
        Ok(ClosedConversation {
            conversation,
            metric,
            closing_message,
        })
    }

    /// Applies manual status, priority, tag and subject edits.
    ///
    /// A target status equal to the current one only applies the other edits.
    /// Closing through this path behaves exactly like [`Self::close`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::StateConflict`] when the status graph has no
    /// edge to the target, [`RegistryError::Validation`] for a blank tag or
    /// subject and [`RegistryError::NotFound`] for unknown conversations.
    pub async fn update_status(
        &self,
        conversation_id: ConversationId,
        actor: &Actor,
        update: StatusUpdate,
    ) -> RegistryResult<Conversation> {
        self.update_status_gated(conversation_id, actor, update, &Ungated)
            .await
    }

    /// [`Self::update_status`] behind `gate`.
    ///
    /// # Errors
    ///
    /// Also returns [`RegistryError::NotAdmitted`] when `gate` refuses.
    pub async fn update_status_gated(
        &self,
        conversation_id: ConversationId,
        actor: &Actor,
        update: StatusUpdate,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<Conversation> {
        let _guard = self.lock(conversation_id).await?;
        let mut conversation = self.load_admitted(conversation_id, gate).await?;
        let previous_status = conversation.status();

        let mut changed = false;
        if let Some(priority) = update.priority {
            changed |= conversation.set_priority(priority, &*self.clock);
        }
        if let Some(tags) = update.tags {
            changed |= conversation.set_tags(tags, &*self.clock)?;
        }
        if let Some(subject) = update.subject.as_deref() {
            changed |= conversation.set_subject(subject, &*self.clock)?;
        }
        match update.status {
            Some(ConversationStatus::Closed) if previous_status != ConversationStatus::Closed => {
                let closed = self.close_locked(conversation, actor).await?;
                return Ok(closed.conversation);
            }
            Some(next) if next != previous_status => {
                conversation.transition_to(next, &*self.clock)?;
                changed = true;
            }
            _ => {}
        }

        if changed {
            self.repository.update(&conversation).await?;
            info!(
                %conversation_id,
                updated_by = %actor.agent_id,
                status = %conversation.status(),
                priority = %conversation.priority(),
                "conversation updated"
            );
            self.publish_status(&conversation, Some(previous_status));
        }
        Ok(conversation)
    }

    /// Marks guest-visible messages of the conversation as read.
    ///
    /// Unknown identifiers, messages of other conversations, internal notes
    /// and messages already read are skipped. Returns the messages that
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown conversations.
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        message_ids: &[MessageId],
    ) -> RegistryResult<Vec<Message>> {
        let _guard = self.lock(conversation_id).await?;
        self.load(conversation_id).await?;
        let now = self.clock.utc();
        let mut marked = Vec::new();
        for &message_id in message_ids {
            let Some(mut message) = self.repository.find_message(message_id).await? else {
                continue;
            };
            if message.conversation_id() != conversation_id || !message.is_guest_visible() {
                continue;
            }
            if message.mark_read(now) {
                self.repository.update_message(&message).await?;
                marked.push(message);
            }
        }
        for message in &marked {
            self.publish_message(ConversationEvent::MessageUpdated {
                message: message.clone(),
            });
        }
        Ok(marked)
    }

    /// Marks one message read on behalf of an agent.
    ///
    /// Returns the message; `read_at` keeps its first value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MessageNotFound`] when the message does not
    /// belong to the conversation.
    pub async fn mark_message_read(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> RegistryResult<Message> {
        let _guard = self.lock(conversation_id).await?;
        let mut message = self.load_message(conversation_id, message_id).await?;
        if message.mark_read(self.clock.utc()) {
            self.repository.update_message(&message).await?;
            self.publish_message(ConversationEvent::MessageUpdated {
                message: message.clone(),
            });
        }
        Ok(message)
    }

    /// Replaces the content of a message authored by `editor`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for invalid content,
    /// [`RegistryError::Forbidden`] when `editor` did not author the message
    /// and [`RegistryError::StateConflict`] for visible messages on closed
    /// conversations.
    pub async fn edit_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        editor: AgentId,
        content: String,
    ) -> RegistryResult<Message> {
        self.edit_message_gated(conversation_id, message_id, editor, content, &Ungated)
            .await
    }

    /// [`Self::edit_message`] behind `gate`.
    ///
    /// # Errors
    ///
    /// Also returns [`RegistryError::NotAdmitted`] when `gate` refuses.
    pub async fn edit_message_gated(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        editor: AgentId,
        content: String,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<Message> {
        validate_content(&content, self.config.max_message_chars)?;
        let _guard = self.lock(conversation_id).await?;
        let conversation = self.load_admitted(conversation_id, gate).await?;
        let mut message = self.load_message(conversation_id, message_id).await?;
        if message.sender() != Sender::User(editor) {
            return Err(ConversationDomainError::NotMessageAuthor(message_id).into());
        }
        conversation.ensure_accepts(message.is_internal_note())?;

        message.edit(content, self.clock.utc());
        self.repository.update_message(&message).await?;
        debug!(%conversation_id, %message_id, %editor, "message edited");
        self.publish_message(ConversationEvent::MessageUpdated {
            message: message.clone(),
        });
        Ok(message)
    }

    /// Returns a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown conversations.
    pub async fn get(&self, conversation_id: ConversationId) -> RegistryResult<Conversation> {
        self.load(conversation_id).await
    }

    /// Returns every message, internal notes included, in order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn history(&self, conversation_id: ConversationId) -> RegistryResult<Vec<Message>> {
        Ok(self.repository.messages(conversation_id).await?)
    }

    /// Returns the latest `limit` guest-visible messages in order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn guest_history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> RegistryResult<Vec<Message>> {
        let mut visible: Vec<Message> = self
            .repository
            .messages(conversation_id)
            .await?
            .into_iter()
            .filter(Message::is_guest_visible)
            .collect();
        let skip = visible.len().saturating_sub(limit);
        visible.drain(..skip);
        Ok(visible)
    }

    /// Lists active conversations, optionally only those assigned to
    /// `agent_id`, highest priority first then oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn list_active(&self, agent_id: Option<AgentId>) -> RegistryResult<Vec<Conversation>> {
        let mut query = ConversationQuery::default().with_statuses([ConversationStatus::Active]);
        if let Some(agent_id) = agent_id {
            query = query.with_assigned_agent(agent_id);
        }
        self.list_by_urgency(&query).await
    }

    /// Lists waiting conversations, highest priority first then oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn list_waiting(&self) -> RegistryResult<Vec<Conversation>> {
        let query = ConversationQuery::default().with_statuses([ConversationStatus::Waiting]);
        self.list_by_urgency(&query).await
    }

    async fn list_by_urgency(&self, query: &ConversationQuery) -> RegistryResult<Vec<Conversation>> {
        let mut conversations = self.repository.list(query).await?;
        conversations.sort_by_key(|conversation| {
            (Reverse(conversation.priority()), conversation.created_at())
        });
        Ok(conversations)
    }

    /// Lists conversations matching `query`, newest first, with unread
    /// guest message counts.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> RegistryResult<Vec<ConversationListing>> {
        let mut conversations = self.repository.list(query).await?;
        conversations.sort_by_key(|conversation| Reverse(conversation.created_at()));
        let mut listings = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let unread_guest_messages = self.repository.unread_guest_count(conversation.id()).await?;
            listings.push(ConversationListing {
                conversation,
                unread_guest_messages,
            });
        }
        Ok(listings)
    }

    /// Returns the close metric, once the conversation has been closed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn metric(
        &self,
        conversation_id: ConversationId,
    ) -> RegistryResult<Option<ConversationMetric>> {
        Ok(self.repository.find_metric(conversation_id).await?)
    }

    /// Returns counts across every conversation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Repository`] when the lookup fails.
    pub async fn stats(&self) -> RegistryResult<ConversationStats> {
        Ok(self.repository.stats().await?)
    }

    /// Stops accepting mutations and waits for in-flight ones to finish.
    pub async fn shutdown(&self) {
        info!("conversation registry draining");
        self.session_locks.shutdown().await;
        self.conversation_locks.shutdown().await;
        info!("conversation registry drained");
    }

    /// Returns `true` once [`Self::shutdown`] has started.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.conversation_locks.is_closing()
    }

    async fn lock(&self, conversation_id: ConversationId) -> RegistryResult<KeyGuard<ConversationId>> {
        self.conversation_locks
            .acquire(conversation_id)
            .await
            .ok_or(RegistryError::ShuttingDown)
    }

    async fn load(&self, conversation_id: ConversationId) -> RegistryResult<Conversation> {
        self.repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(RegistryError::NotFound(conversation_id))
    }

    async fn load_admitted(
        &self,
        conversation_id: ConversationId,
        gate: &dyn ConversationGate,
    ) -> RegistryResult<Conversation> {
        let conversation = self.load(conversation_id).await?;
        if !gate.admits(&conversation) {
            return Err(RegistryError::NotAdmitted(conversation_id));
        }
        Ok(conversation)
    }

    async fn load_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> RegistryResult<Message> {
        self.repository
            .find_message(message_id)
            .await?
            .filter(|message| message.conversation_id() == conversation_id)
            .ok_or(RegistryError::MessageNotFound(message_id))
    }

    fn publish_status(&self, conversation: &Conversation, previous_status: Option<ConversationStatus>) {
        let event = ConversationEvent::StatusChanged {
            conversation: conversation.into(),
            previous_status,
        };
        self.events
            .publish(&EventChannel::Conversation(conversation.id()), event.clone());
        self.events.publish(&EventChannel::Admin, event);
    }

    /// Internal notes go to the admin channel only; guests may listen on the
    /// conversation channel.
    fn publish_message(&self, event: ConversationEvent) {
        let internal = match &event {
            ConversationEvent::MessageSent { message }
            | ConversationEvent::MessageUpdated { message } => message.is_internal_note(),
            ConversationEvent::StatusChanged { .. } => false,
        };
        let channel = if internal {
            EventChannel::Admin
        } else {
            EventChannel::Conversation(event.conversation_id())
        };
        self.events.publish(&channel, event);
    }
}
