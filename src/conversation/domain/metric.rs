//! Immutable snapshot of a conversation computed when it closes.

use super::{ConversationId, Message, Sender};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a closed conversation was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// At least one agent replied.
    ResolvedByAgent,
    /// Only the bot replied.
    ResolvedByBot,
    /// Nobody replied to the guest.
    Unanswered,
}

/// Per-conversation figures captured exactly once, at close time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetric {
    conversation_id: ConversationId,
    total_messages: u64,
    guest_messages: u64,
    bot_messages: u64,
    human_messages: u64,
    system_messages: u64,
    internal_notes: u64,
    avg_response_time_seconds: Option<i64>,
    resolution: Resolution,
    created_at: DateTime<Utc>,
}

impl ConversationMetric {
    /// Computes the snapshot from the conversation's messages in order.
    ///
    /// Internal notes are counted separately and ignored for response times.
    /// A response time is measured from the first unanswered guest message to
    /// the next bot or agent reply.
    #[must_use]
    pub fn compute(
        conversation_id: ConversationId,
        messages: &[Message],
        at: DateTime<Utc>,
    ) -> Self {
        let mut metric = Self {
            conversation_id,
            total_messages: 0,
            guest_messages: 0,
            bot_messages: 0,
            human_messages: 0,
            system_messages: 0,
            internal_notes: 0,
            avg_response_time_seconds: None,
            resolution: Resolution::Unanswered,
            created_at: at,
        };

        let mut pending_since: Option<DateTime<Utc>> = None;
        let mut response_times: Vec<i64> = Vec::new();
        for message in messages {
            metric.total_messages += 1;
            if message.is_internal_note() {
                metric.internal_notes += 1;
                continue;
            }
            match message.sender() {
                Sender::Guest(_) => {
                    metric.guest_messages += 1;
                    pending_since.get_or_insert(message.created_at());
                }
                Sender::Bot => {
                    metric.bot_messages += 1;
                    if let Some(asked_at) = pending_since.take() {
                        response_times.push((message.created_at() - asked_at).num_seconds());
                    }
                }
                Sender::User(_) => {
                    metric.human_messages += 1;
                    if let Some(asked_at) = pending_since.take() {
                        response_times.push((message.created_at() - asked_at).num_seconds());
                    }
                }
                Sender::System => metric.system_messages += 1,
            }
        }

        let samples = i64::try_from(response_times.len()).unwrap_or(i64::MAX);
        metric.avg_response_time_seconds = response_times.iter().sum::<i64>().checked_div(samples);
        metric.resolution = if metric.human_messages > 0 {
            Resolution::ResolvedByAgent
        } else if metric.bot_messages > 0 {
            Resolution::ResolvedByBot
        } else {
            Resolution::Unanswered
        };
        metric
    }

    /// Returns the conversation the snapshot describes.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Returns the number of messages, internal notes included.
    #[must_use]
    pub const fn total_messages(&self) -> u64 {
        self.total_messages
    }

    /// Returns the number of guest messages.
    #[must_use]
    pub const fn guest_messages(&self) -> u64 {
        self.guest_messages
    }

    /// Returns the number of bot replies.
    #[must_use]
    pub const fn bot_messages(&self) -> u64 {
        self.bot_messages
    }

    /// Returns the number of guest-visible agent messages.
    #[must_use]
    pub const fn human_messages(&self) -> u64 {
        self.human_messages
    }

    /// Returns the number of platform notices.
    #[must_use]
    pub const fn system_messages(&self) -> u64 {
        self.system_messages
    }

    /// Returns the number of internal notes.
    #[must_use]
    pub const fn internal_notes(&self) -> u64 {
        self.internal_notes
    }

    /// Returns the mean first-response time, when any guest got a reply.
    #[must_use]
    pub const fn avg_response_time_seconds(&self) -> Option<i64> {
        self.avg_response_time_seconds
    }

    /// Returns the resolution outcome.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Returns `true` unless the guest never got a reply.
    #[must_use]
    pub fn was_resolved(&self) -> bool {
        self.resolution != Resolution::Unanswered
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
