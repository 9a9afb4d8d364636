//! Support desk facade: the guest and agent channels over the core services.

use super::error::{DeskError, DeskResult};
use crate::agent::{
    adapters::memory::InMemoryAgentDirectory,
    domain::{Agent, AgentId},
    ports::AgentDirectory,
};
use crate::bot::{
    adapters::memory::InMemoryTriggerRuleRepository, ports::TriggerRuleRepository,
    services::BotMatcher,
};
use crate::broadcast::{BroadcastHub, Subscription};
use crate::config::DeskConfig;
use crate::conversation::{
    adapters::memory::InMemoryConversationRepository,
    domain::{
        Attachment, Conversation, ConversationId, ConversationMetric, ConversationStats,
        ConversationStatus, EventChannel, Message, MessageDraft, MessageId, ReferenceId,
    },
    ports::{
        ConversationAccessPolicy, ConversationAction, ConversationEventSink, ConversationQuery,
        ConversationRepository,
    },
    services::{
        Actor, ClosedConversation, ConversationGate, ConversationListing, ConversationRegistry,
        RegistryError, StatusUpdate,
    },
};
use crate::routing::{RoutingEngine, RoutingOutcome};
use crate::session::{
    adapters::memory::InMemorySessionRepository,
    domain::{GuestSession, SessionMetadata, SessionToken},
    ports::GuestSessionRepository,
    services::SessionStore,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Token and expiry handed to a newly arrived guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGrant {
    /// Opaque session token.
    pub token: SessionToken,
    /// When the session stops being usable unless extended.
    pub expires_at: DateTime<Utc>,
}

/// Guest-visible history of the session's open conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestHistory {
    /// Latest guest-visible messages, oldest first.
    pub messages: Vec<Message>,
    /// Status of the open conversation, absent when there is none.
    pub status: Option<ConversationStatus>,
    /// Reference of the open conversation, absent when there is none.
    pub reference_id: Option<ReferenceId>,
}

/// Everything an agent dashboard shows for one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDetail {
    /// The conversation.
    pub conversation: Conversation,
    /// Every message, internal notes included, in order.
    pub messages: Vec<Message>,
    /// The owning guest session, when it is still stored.
    pub session: Option<GuestSession>,
}

/// Storage backends the desk runs on.
pub struct DeskBackends<S, R, B, D> {
    /// Guest session storage.
    pub sessions: Arc<S>,
    /// Conversation and message storage.
    pub conversations: Arc<R>,
    /// Trigger rule storage.
    pub rules: Arc<B>,
    /// Staff directory.
    pub agents: Arc<D>,
}

impl
    DeskBackends<
        InMemorySessionRepository,
        InMemoryConversationRepository,
        InMemoryTriggerRuleRepository,
        InMemoryAgentDirectory,
    >
{
    /// Creates empty in-memory backends.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemorySessionRepository::new()),
            conversations: Arc::new(InMemoryConversationRepository::new()),
            rules: Arc::new(InMemoryTriggerRuleRepository::new()),
            agents: Arc::new(InMemoryAgentDirectory::new()),
        }
    }
}

/// A desk running entirely on in-memory adapters.
pub type InMemoryDesk<C> = SupportDesk<
    InMemorySessionRepository,
    InMemoryConversationRepository,
    InMemoryTriggerRuleRepository,
    InMemoryAgentDirectory,
    C,
>;

/// Boundary facade for the guest and agent channels.
///
/// Guest operations are keyed by session token and extend the session.
/// Agent operations take the acting agent's id, resolve it in the directory
/// and ask the access policy before touching a conversation.
pub struct SupportDesk<S, R, B, D, C>
where
    S: GuestSessionRepository,
    R: ConversationRepository,
    B: TriggerRuleRepository,
    D: AgentDirectory,
    C: Clock + Send + Sync + 'static,
{
    sessions: Arc<SessionStore<S, C>>,
    registry: Arc<ConversationRegistry<R, C>>,
    routing: RoutingEngine<S, R, B, D, C>,
    agents: Arc<D>,
    hub: Arc<BroadcastHub<C>>,
    access: Arc<dyn ConversationAccessPolicy>,
    clock: Arc<C>,
    config: DeskConfig,
}

impl<S, R, B, D, C> SupportDesk<S, R, B, D, C>
where
    S: GuestSessionRepository,
    R: ConversationRepository,
    B: TriggerRuleRepository,
    D: AgentDirectory,
    C: Clock + Send + Sync + 'static,
{
    /// Wires the core services over `backends`.
    ///
    /// The broadcast hub is created stopped; call [`Self::start`] before
    /// subscribing.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Config`] when `config` fails validation.
    pub fn new(
        config: DeskConfig,
        backends: DeskBackends<S, R, B, D>,
        access: Arc<dyn ConversationAccessPolicy>,
        clock: Arc<C>,
    ) -> DeskResult<Self> {
        config.validate()?;
        let sessions = Arc::new(SessionStore::new(
            backends.sessions,
            Arc::clone(&clock),
            config.session_ttl()?,
        ));
        let hub = Arc::new(BroadcastHub::new(config.hub_config(), Arc::clone(&clock)));
        let sink: Arc<dyn ConversationEventSink> = hub.clone();
        let registry = Arc::new(ConversationRegistry::new(
            backends.conversations,
            Arc::clone(&clock),
            sink,
            config.registry_config(),
        ));
        let routing = RoutingEngine::new(
            Arc::clone(&sessions),
            Arc::clone(&registry),
            Arc::new(BotMatcher::new(backends.rules)),
            Arc::clone(&backends.agents),
            config.routing_policy(),
        );
        Ok(Self {
            sessions,
            registry,
            routing,
            agents: backends.agents,
            hub,
            access,
            clock,
            config,
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Returns the broadcast hub.
    #[must_use]
    pub const fn hub(&self) -> &Arc<BroadcastHub<C>> {
        &self.hub
    }

    /// Starts event delivery.
    pub fn start(&self) {
        self.hub.start();
    }

    /// Drains in-flight conversation changes, then stops event delivery.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        self.hub.stop();
        info!("support desk stopped");
    }

    // Guest channel.

    /// Creates a guest session.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Session`] when the session cannot be stored.
    pub async fn initialize_session(&self, metadata: SessionMetadata) -> DeskResult<SessionGrant> {
        let session = self.sessions.create_session(metadata).await?;
        Ok(SessionGrant {
            token: session.token(),
            expires_at: session.expires_at(),
        })
    }

    /// Routes a guest message to the bot or a human.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Session`] for unknown or expired sessions and
    /// [`DeskError::Registry`] when the message is rejected.
    pub async fn send_guest_message(
        &self,
        token: SessionToken,
        content: &str,
    ) -> DeskResult<RoutingOutcome> {
        Ok(self.routing.handle_guest_message(token, content).await?)
    }

    /// Routes a guest message carrying attachment descriptors. The files
    /// themselves are stored elsewhere.
    ///
    /// # Errors
    ///
    /// As [`Self::send_guest_message`]; more than five descriptors is a
    /// validation error.
    pub async fn send_guest_upload(
        &self,
        token: SessionToken,
        caption: &str,
        attachments: Vec<Attachment>,
    ) -> DeskResult<RoutingOutcome> {
        Ok(self
            .routing
            .handle_guest_upload(token, caption, attachments)
            .await?)
    }

    /// Returns the latest guest-visible messages of the session's open
    /// conversation. `limit` defaults and clamps to the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Session`] for unknown or expired sessions.
    pub async fn get_history(
        &self,
        token: SessionToken,
        limit: Option<usize>,
    ) -> DeskResult<GuestHistory> {
        self.sessions.touch(token).await?;
        let Some(conversation) = self.registry.find_open_for_session(token).await? else {
            return Ok(GuestHistory::default());
        };
        let limit = self.config.history_limit(limit);
        let messages = self
            .registry
            .guest_history(conversation.id(), limit)
            .await?;
        Ok(GuestHistory {
            messages,
            status: Some(conversation.status()),
            reference_id: Some(conversation.reference_id().clone()),
        })
    }

    /// Marks messages of the session's open conversation as read and returns
    /// those that changed.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Session`] for unknown or expired sessions.
    pub async fn mark_read(
        &self,
        token: SessionToken,
        message_ids: &[MessageId],
    ) -> DeskResult<Vec<Message>> {
        self.sessions.touch(token).await?;
        let Some(conversation) = self.registry.find_open_for_session(token).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .registry
            .mark_read(conversation.id(), message_ids)
            .await?)
    }

    /// Subscribes a guest to their open conversation's events.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Session`] for unknown or expired sessions,
    /// [`DeskError::NoOpenConversation`] before the guest's first message and
    /// [`DeskError::Broadcast`] when the hub is stopped.
    pub async fn subscribe_guest(&self, token: SessionToken) -> DeskResult<Subscription> {
        self.sessions.validate(token).await?;
        let conversation = self
            .registry
            .find_open_for_session(token)
            .await?
            .ok_or(DeskError::NoOpenConversation(token))?;
        Ok(self
            .hub
            .subscribe(EventChannel::Conversation(conversation.id()))?)
    }

    // Agent channel.

    /// Subscribes an agent to every status change.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents and
    /// [`DeskError::Broadcast`] when the hub is stopped.
    pub async fn subscribe_admin(&self, actor: AgentId) -> DeskResult<Subscription> {
        self.agent(actor).await?;
        Ok(self.hub.subscribe(EventChannel::Admin)?)
    }

    /// Subscribes an agent to one conversation's messages.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the agent may view the
    /// conversation.
    pub async fn subscribe_conversation(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
    ) -> DeskResult<Subscription> {
        self.authorize(actor, ConversationAction::View, conversation_id)
            .await?;
        Ok(self
            .hub
            .subscribe(EventChannel::Conversation(conversation_id))?)
    }

    /// Lists active conversations, optionally only those of `assigned_to`.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn list_active(
        &self,
        actor: AgentId,
        assigned_to: Option<AgentId>,
    ) -> DeskResult<Vec<Conversation>> {
        self.agent(actor).await?;
        Ok(self.registry.list_active(assigned_to).await?)
    }

    /// Lists the waiting queue.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn list_waiting(&self, actor: AgentId) -> DeskResult<Vec<Conversation>> {
        self.agent(actor).await?;
        Ok(self.registry.list_waiting().await?)
    }

    /// Assigns `assignee`, or the acting agent when absent.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may assign,
    /// [`DeskError::UnknownAgent`] for unknown agents and
    /// [`DeskError::Registry`] for closed conversations.
    pub async fn assign(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
        assignee: Option<AgentId>,
    ) -> DeskResult<Conversation> {
        let agent = self.agent(actor).await?;
        let target = match assignee {
            Some(id) if id != actor => self.agent(id).await?.id(),
            _ => actor,
        };
        let action = ConversationAction::Assign;
        self.registry
            .assign_gated(conversation_id, target, &self.gate(&agent, action))
            .await
            .map_err(|err| not_admitted(err, actor, action))
    }

    /// Appends a reply or internal note authored by the acting agent.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may respond and
    /// [`DeskError::Registry`] for rejected content or closed conversations.
    pub async fn send_agent_message(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
        content: &str,
        is_internal_note: bool,
    ) -> DeskResult<Message> {
        let agent = self.agent(actor).await?;
        let mut draft = MessageDraft::agent(agent.id(), agent.name(), content);
        if is_internal_note {
            draft = draft.internal_note();
        }
        let action = ConversationAction::Respond;
        let message = self
            .registry
            .append_message_gated(conversation_id, draft, &self.gate(&agent, action))
            .await
            .map_err(|err| not_admitted(err, actor, action))?;
        if let Err(err) = self
            .agents
            .touch_last_active(agent.id(), self.clock.utc())
            .await
        {
            warn!(agent_id = %agent.id(), %err, "failed to record agent activity");
        }
        Ok(message)
    }

    /// Closes a conversation on behalf of the acting agent.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may close and
    /// [`DeskError::Registry`] when the conversation is already closed.
    pub async fn close(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
    ) -> DeskResult<ClosedConversation> {
        let agent = self.agent(actor).await?;
        let action = ConversationAction::Close;
        self.registry
            .close_gated(
                conversation_id,
                &Actor::from(&agent),
                &self.gate(&agent, action),
            )
            .await
            .map_err(|err| not_admitted(err, actor, action))
    }

    /// Applies manual status, priority and tag edits.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may update and
    /// [`DeskError::Registry`] for transitions the status graph lacks.
    pub async fn update_status(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
        update: StatusUpdate,
    ) -> DeskResult<Conversation> {
        let agent = self.agent(actor).await?;
        let action = ConversationAction::Update;
        self.registry
            .update_status_gated(
                conversation_id,
                &Actor::from(&agent),
                update,
                &self.gate(&agent, action),
            )
            .await
            .map_err(|err| not_admitted(err, actor, action))
    }

    /// Returns a conversation with its full message log and guest session.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may view.
    pub async fn get_conversation_detail(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
    ) -> DeskResult<ConversationDetail> {
        let (_, conversation) = self
            .authorize(actor, ConversationAction::View, conversation_id)
            .await?;
        let messages = self.registry.history(conversation_id).await?;
        let session = self.sessions.find(conversation.session_token()).await?;
        Ok(ConversationDetail {
            conversation,
            messages,
            session,
        })
    }

    /// Returns the close metric of a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may view.
    pub async fn metric(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
    ) -> DeskResult<Option<ConversationMetric>> {
        self.authorize(actor, ConversationAction::View, conversation_id)
            .await?;
        Ok(self.registry.metric(conversation_id).await?)
    }

    /// Marks one message read.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may view and
    /// [`DeskError::Registry`] for messages outside the conversation.
    pub async fn mark_message_read(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> DeskResult<Message> {
        self.authorize(actor, ConversationAction::View, conversation_id)
            .await?;
        Ok(self
            .registry
            .mark_message_read(conversation_id, message_id)
            .await?)
    }

    /// Replaces the content of a message the acting agent wrote.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Forbidden`] unless the actor may respond and
    /// [`DeskError::Registry`] when they did not author the message.
    pub async fn edit_message(
        &self,
        actor: AgentId,
        conversation_id: ConversationId,
        message_id: MessageId,
        content: String,
    ) -> DeskResult<Message> {
        let agent = self.agent(actor).await?;
        let action = ConversationAction::Respond;
        self.registry
            .edit_message_gated(
                conversation_id,
                message_id,
                actor,
                content,
                &self.gate(&agent, action),
            )
            .await
            .map_err(|err| not_admitted(err, actor, action))
    }

    /// Searches conversations, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn list_conversations(
        &self,
        actor: AgentId,
        query: &ConversationQuery,
    ) -> DeskResult<Vec<ConversationListing>> {
        self.agent(actor).await?;
        Ok(self.registry.list_conversations(query).await?)
    }

    /// Returns desk-wide counts.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn stats(&self, actor: AgentId) -> DeskResult<ConversationStats> {
        self.agent(actor).await?;
        Ok(self.registry.stats().await?)
    }

    /// Lists every staff member.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn list_agents(&self, actor: AgentId) -> DeskResult<Vec<Agent>> {
        self.agent(actor).await?;
        Ok(self.agents.list_all().await?)
    }

    /// Lists staff members currently online.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::UnknownAgent`] for unknown agents.
    pub async fn list_online_agents(&self, actor: AgentId) -> DeskResult<Vec<Agent>> {
        self.agent(actor).await?;
        Ok(self.agents.list_online().await?)
    }

    async fn agent(&self, id: AgentId) -> DeskResult<Agent> {
        self.agents
            .find_by_id(id)
            .await?
            .ok_or(DeskError::UnknownAgent(id))
    }

    fn gate<'a>(&'a self, agent: &'a Agent, action: ConversationAction) -> PolicyGate<'a> {
        PolicyGate {
            access: &*self.access,
            agent,
            action,
        }
    }

    /// Checks a read against the current conversation. Changes go through
    /// [`Self::gate`] instead so the check sees the locked state.
    async fn authorize(
        &self,
        actor: AgentId,
        action: ConversationAction,
        conversation_id: ConversationId,
    ) -> DeskResult<(Agent, Conversation)> {
        let agent = self.agent(actor).await?;
        let conversation = self.registry.get(conversation_id).await?;
        if !self.access.permits(&agent, action, &conversation) {
            debug!(agent_id = %actor, %action, %conversation_id, "access denied");
            return Err(DeskError::Forbidden {
                agent_id: actor,
                action,
                conversation_id,
            });
        }
        Ok((agent, conversation))
    }
}

/// Access policy evaluated by the registry under the conversation lock.
struct PolicyGate<'a> {
    access: &'a dyn ConversationAccessPolicy,
    agent: &'a Agent,
    action: ConversationAction,
}

impl ConversationGate for PolicyGate<'_> {
    fn admits(&self, conversation: &Conversation) -> bool {
        self.access.permits(self.agent, self.action, conversation)
    }
}

fn not_admitted(err: RegistryError, agent_id: AgentId, action: ConversationAction) -> DeskError {
    match err {
        RegistryError::NotAdmitted(conversation_id) => {
            debug!(%agent_id, %action, %conversation_id, "access denied");
            DeskError::Forbidden {
                agent_id,
                action,
                conversation_id,
            }
        }
        other => other.into(),
    }
}
