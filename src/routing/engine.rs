//! Per-message routing between the bot and human agents.

use crate::agent::{domain::AgentId, ports::AgentDirectory};
use crate::bot::{domain::MatchResult, ports::TriggerRuleRepository, services::BotMatcher};
use crate::conversation::{
    domain::{
        Attachment, BotAnnotation, Conversation, Message, MessageDraft, validate_attachments,
        validate_content,
    },
    ports::ConversationRepository,
    services::{ConversationRegistry, RegistryError},
};
use crate::session::{
    domain::SessionToken,
    ports::GuestSessionRepository,
    services::{SessionStore, SessionStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced to the guest channel while routing a message.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The session is unknown or expired.
    #[error(transparent)]
    Session(#[from] SessionStoreError),

    /// The message was rejected or could not be recorded.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result type for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Tunables for routing decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    /// Bot replies scoring below this need a human.
    pub human_review_threshold: f64,
    /// Notice returned to the guest when no bot reply was produced.
    pub escalation_notice: String,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            human_review_threshold: 0.8,
            escalation_notice: "Thank you for your message. An agent will be with you shortly."
                .to_owned(),
        }
    }
}

/// What happened to one guest message.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingOutcome {
    /// The conversation after routing.
    pub conversation: Conversation,
    /// The stored guest message.
    pub guest_message: Message,
    /// The stored bot reply, when a rule matched.
    pub bot_message: Option<Message>,
    /// `true` when a human should take over.
    pub requires_human: bool,
    /// Escalation notice for the guest, when the bot did not reply.
    pub notice: Option<String>,
}

impl RoutingOutcome {
    /// Returns the agent handling the conversation, if any.
    #[must_use]
    pub const fn assigned_agent(&self) -> Option<AgentId> {
        self.conversation.assigned_agent()
    }
}

/// Bot-versus-human router for inbound guest messages.
pub struct RoutingEngine<S, R, B, D, C>
where
    S: GuestSessionRepository,
    R: ConversationRepository,
    B: TriggerRuleRepository,
    D: AgentDirectory,
    C: Clock + Send + Sync,
{
    sessions: Arc<SessionStore<S, C>>,
    registry: Arc<ConversationRegistry<R, C>>,
    bot: Arc<BotMatcher<B>>,
    agents: Arc<D>,
    policy: RoutingPolicy,
}

impl<S, R, B, D, C> RoutingEngine<S, R, B, D, C>
where
    S: GuestSessionRepository,
    R: ConversationRepository,
    B: TriggerRuleRepository,
    D: AgentDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a routing engine over shared services.
    #[must_use]
    pub const fn new(
        sessions: Arc<SessionStore<S, C>>,
        registry: Arc<ConversationRegistry<R, C>>,
        bot: Arc<BotMatcher<B>>,
        agents: Arc<D>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            sessions,
            registry,
            bot,
            agents,
            policy,
        }
    }

    /// Returns the routing policy.
    #[must_use]
    pub const fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Records a guest message and lets the bot or a human handle it.
    ///
    /// The session is validated and extended first. The message goes to the
    /// session's open conversation, which is created on demand. A bot match
    /// appends a reply; a miss escalates to `waiting`, then hands the
    /// conversation back to its assigned agent or to the first available
    /// one, if there is one.
    ///
    /// Bot lookup or directory failures are logged and treated as a miss or
    /// as no agent available, since the guest message is already stored.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::Session`] for unknown or expired sessions and
    /// [`RoutingError::Registry`] when the message is rejected or cannot be
    /// stored.
    pub async fn handle_guest_message(
        &self,
        token: SessionToken,
        content: &str,
    ) -> RoutingResult<RoutingOutcome> {
        self.handle_guest_upload(token, content, Vec::new()).await
    }

    /// Like [`Self::handle_guest_message`], with attachment descriptors
    /// stored on the guest message. `content` serves as the caption and is
    /// what the bot matches against.
    ///
    /// # Errors
    ///
    /// Also returns [`RoutingError::Registry`] when there are more than
    /// [`MAX_ATTACHMENTS`](crate::conversation::domain::MAX_ATTACHMENTS)
    /// descriptors.
    pub async fn handle_guest_upload(
        &self,
        token: SessionToken,
        content: &str,
        attachments: Vec<Attachment>,
    ) -> RoutingResult<RoutingOutcome> {
        self.sessions.touch(token).await?;
        validate_content(content, self.registry.config().max_message_chars)
            .and_then(|()| validate_attachments(&attachments))
            .map_err(RegistryError::from)?;

        let (conversation, guest_message) = self
            .record_guest_message(token, content, &attachments)
            .await?;

        match self.match_reply(content).await {
            Some(matched) => self.reply_with_bot(conversation, guest_message, matched).await,
            None => self.escalate(conversation, guest_message).await,
        }
    }

    /// Appends to the open conversation, retrying once with a fresh one when
    /// it was closed between lookup and append.
    async fn record_guest_message(
        &self,
        token: SessionToken,
        content: &str,
        attachments: &[Attachment],
    ) -> RoutingResult<(Conversation, Message)> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let conversation = self.registry.get_or_create(token).await?;
            match self
                .registry
                .append_message(
                    conversation.id(),
                    MessageDraft::guest(token, content).with_attachments(attachments.to_vec()),
                )
                .await
            {
                Ok(message) => return Ok((conversation, message)),
                Err(RegistryError::StateConflict(err)) if attempts < 2 => {
                    debug!(conversation_id = %conversation.id(), %err, "conversation closed mid-route, reopening");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn match_reply(&self, content: &str) -> Option<MatchResult> {
        match self.bot.match_message(content).await {
            Ok(matched) => matched,
            Err(err) => {
                warn!(%err, "bot matcher unavailable, escalating");
                None
            }
        }
    }

    async fn reply_with_bot(
        &self,
        conversation: Conversation,
        guest_message: Message,
        matched: MatchResult,
    ) -> RoutingResult<RoutingOutcome> {
        let requires_human = matched.confidence.below(self.policy.human_review_threshold);
        let draft = MessageDraft::bot(
            matched.response_text,
            BotAnnotation {
                confidence: matched.confidence.value(),
                intent: matched.intent,
                requires_human_review: requires_human,
            },
        );
        let bot_message = self
            .registry
            .append_message(conversation.id(), draft)
            .await?;
        let conversation = self.registry.get(conversation.id()).await?;
        Ok(RoutingOutcome {
            conversation,
            guest_message,
            bot_message: Some(bot_message),
            requires_human,
            notice: None,
        })
    }

    async fn escalate(
        &self,
        conversation: Conversation,
        guest_message: Message,
    ) -> RoutingResult<RoutingOutcome> {
        let mut conversation = self.registry.escalate(conversation.id()).await?;

        if let Some(agent_id) = conversation.assigned_agent() {
            conversation = self.registry.assign(conversation.id(), agent_id).await?;
            debug!(
                conversation_id = %conversation.id(),
                %agent_id,
                "bot miss handed back to the assigned agent"
            );
        } else {
            match self.agents.first_available().await {
                Ok(Some(agent)) => {
                    conversation = self.registry.assign(conversation.id(), agent.id()).await?;
                    info!(
                        conversation_id = %conversation.id(),
                        agent_id = %agent.id(),
                        "escalated conversation auto-assigned"
                    );
                }
                Ok(None) => {
                    info!(conversation_id = %conversation.id(), "escalated conversation waiting for an agent");
                }
                Err(err) => {
                    warn!(conversation_id = %conversation.id(), %err, "agent directory unavailable, leaving conversation waiting");
                }
            }
        }

        Ok(RoutingOutcome {
            conversation,
            guest_message,
            bot_message: None,
            requires_human: true,
            notice: Some(self.policy.escalation_notice.clone()),
        })
    }
}
