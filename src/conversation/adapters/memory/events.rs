//! Event sink that keeps every published event for inspection.

use std::sync::{Arc, Mutex};

use crate::conversation::{
    domain::{ConversationEvent, EventChannel},
    ports::ConversationEventSink,
};

/// Sink that records `(channel, event)` pairs in publish order.
///
/// Useful when a test needs the exact event stream without running a
/// broadcast hub.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<(EventChannel, ConversationEvent)>>>,
}

impl RecordingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far.
    #[must_use]
    pub fn events(&self) -> Vec<(EventChannel, ConversationEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the events published on `channel`, in order.
    #[must_use]
    pub fn events_on(&self, channel: &EventChannel) -> Vec<ConversationEvent> {
        self.events()
            .into_iter()
            .filter(|(published_on, _)| published_on == channel)
            .map(|(_, event)| event)
            .collect()
    }
}

impl ConversationEventSink for RecordingEventSink {
    fn publish(&self, channel: &EventChannel, event: ConversationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((*channel, event));
        }
    }
}
