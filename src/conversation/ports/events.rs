//! Outbound port for committed conversation events.

use crate::conversation::domain::{ConversationEvent, EventChannel};

/// Receives events after the change they describe has been committed.
///
/// Publishing must not block: the registry calls it while holding the
/// conversation lock so that per-conversation order is preserved.
pub trait ConversationEventSink: Send + Sync {
    /// Delivers `event` to listeners of `channel`.
    fn publish(&self, channel: &EventChannel, event: ConversationEvent);
}
