//! In-memory repository for conversations, messages and metrics.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::conversation::{
    domain::{
        Conversation, ConversationId, ConversationMetric, ConversationStats, ConversationStatus,
        Message, MessageId,
    },
    ports::{
        ConversationQuery, ConversationRepository, ConversationRepositoryError,
        ConversationRepositoryResult,
    },
};

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    message_owner: HashMap<MessageId, ConversationId>,
    metrics: HashMap<ConversationId, ConversationMetric>,
    sequences: HashMap<i32, u32>,
}

impl State {
    fn push_message(&mut self, message: &Message) -> ConversationRepositoryResult<()> {
        if self.message_owner.contains_key(&message.id()) {
            return Err(ConversationRepositoryError::DuplicateMessage(message.id()));
        }
        self.message_owner
            .insert(message.id(), message.conversation_id());
        self.messages
            .entry(message.conversation_id())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    fn replace_conversation(
        &mut self,
        conversation: &Conversation,
    ) -> ConversationRepositoryResult<()> {
        let slot = self
            .conversations
            .get_mut(&conversation.id())
            .ok_or(ConversationRepositoryError::NotFound(conversation.id()))?;
        *slot = conversation.clone();
        Ok(())
    }
}

/// Thread-safe in-memory conversation repository.
///
/// Every multi-entity write happens under one write lock, so readers never
/// observe a message without its counter change or a metric without its
/// closed row.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryConversationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> ConversationRepositoryError {
    ConversationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn next_reference_sequence(&self, year: i32) -> ConversationRepositoryResult<u32> {
        let mut state = self.state.write().map_err(poisoned)?;
        let counter = state.sequences.entry(year).or_insert(0);
        *counter = counter.saturating_add(1);
        Ok(*counter)
    }

    async fn insert(&self, conversation: &Conversation) -> ConversationRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.conversations.contains_key(&conversation.id()) {
            return Err(ConversationRepositoryError::Duplicate(conversation.id()));
        }
        state
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(())
    }

    async fn update(&self, conversation: &Conversation) -> ConversationRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.replace_conversation(conversation)
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> ConversationRepositoryResult<Option<Conversation>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.conversations.get(&id).cloned())
    }

    async fn list(&self, query: &ConversationQuery) -> ConversationRepositoryResult<Vec<Conversation>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .conversations
            .values()
            .filter(|conversation| query.matches(conversation))
            .cloned()
            .collect())
    }

    async fn append_message(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> ConversationRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.conversations.contains_key(&conversation.id()) {
            return Err(ConversationRepositoryError::NotFound(conversation.id()));
        }
        state.push_message(message)?;
        state.replace_conversation(conversation)
    }

    async fn update_message(&self, message: &Message) -> ConversationRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let slot = state
            .messages
            .get_mut(&message.conversation_id())
            .and_then(|messages| messages.iter_mut().find(|stored| stored.id() == message.id()))
            .ok_or(ConversationRepositoryError::MessageNotFound(message.id()))?;
        *slot = message.clone();
        Ok(())
    }

    async fn messages(&self, id: ConversationId) -> ConversationRepositoryResult<Vec<Message>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut messages = state.messages.get(&id).cloned().unwrap_or_default();
        messages.sort_by_key(Message::sequence);
        Ok(messages)
    }

    async fn find_message(&self, id: MessageId) -> ConversationRepositoryResult<Option<Message>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .message_owner
            .get(&id)
            .and_then(|owner| state.messages.get(owner))
            .and_then(|messages| messages.iter().find(|message| message.id() == id))
            .cloned())
    }

    async fn commit_close(
        &self,
        conversation: &Conversation,
        metric: &ConversationMetric,
        closing_message: &Message,
    ) -> ConversationRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.metrics.contains_key(&conversation.id()) {
            return Err(ConversationRepositoryError::MetricAlreadyRecorded(
                conversation.id(),
            ));
        }
        if !state.conversations.contains_key(&conversation.id()) {
            return Err(ConversationRepositoryError::NotFound(conversation.id()));
        }
        state.push_message(closing_message)?;
        state.replace_conversation(conversation)?;
        state.metrics.insert(conversation.id(), metric.clone());
        Ok(())
    }

    async fn find_metric(
        &self,
        id: ConversationId,
    ) -> ConversationRepositoryResult<Option<ConversationMetric>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.metrics.get(&id).cloned())
    }

    async fn unread_guest_count(&self, id: ConversationId) -> ConversationRepositoryResult<u64> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .messages
            .get(&id)
            .map_or(0, |messages| count_unread_guest(messages)))
    }

    async fn stats(&self) -> ConversationRepositoryResult<ConversationStats> {
        let state = self.state.read().map_err(poisoned)?;
        let mut stats = ConversationStats::default();
        for status in ConversationStatus::ALL {
            stats.by_status.insert(status.as_str().to_owned(), 0);
        }
        for conversation in state.conversations.values() {
            *stats
                .by_status
                .entry(conversation.status().as_str().to_owned())
                .or_insert(0) += 1;
        }
        for messages in state.messages.values() {
            stats.total_messages += u64::try_from(messages.len()).unwrap_or(u64::MAX);
            stats.unread_guest_messages += count_unread_guest(messages);
        }
        Ok(stats)
    }
}

fn count_unread_guest(messages: &[Message]) -> u64 {
    let unread = messages
        .iter()
        .filter(|message| message.sender().is_guest() && message.read_at().is_none())
        .count();
    u64::try_from(unread).unwrap_or(u64::MAX)
}
