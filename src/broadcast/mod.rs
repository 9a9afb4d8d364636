//! Broadcast hub: fans committed conversation events out to listeners.
//!
//! Listeners subscribe to the admin channel or to one conversation's channel
//! and receive [`EventEnvelope`]s through a bounded queue. Publishing never
//! waits on a listener: a full queue drops the event for that listener, and a
//! listener that keeps falling behind is disconnected.

mod envelope;
mod hub;

pub use envelope::{EventEnvelope, SubscriptionId};
pub use hub::{BroadcastHub, HubConfig, HubError, Subscription};

#[cfg(test)]
mod tests;
