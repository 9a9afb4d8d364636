//! Wire envelope for published events.

use crate::conversation::domain::{ConversationEvent, EventChannel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An event as delivered to listeners.
///
/// `event_id` is unique per publish so clients can drop duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier of this publish.
    pub event_id: Uuid,
    /// Channel the event was published on.
    pub channel: EventChannel,
    /// Wire name, such as `message.sent`.
    pub name: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
    /// The event itself.
    pub event: ConversationEvent,
}

impl EventEnvelope {
    /// Wraps `event` for delivery on `channel`.
    #[must_use]
    pub fn new(channel: EventChannel, event: ConversationEvent, published_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            channel,
            name: event.name().to_owned(),
            published_at,
            event,
        }
    }
}

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
