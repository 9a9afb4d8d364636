//! Channel-keyed fan-out with bounded per-listener queues.

use super::{EventEnvelope, SubscriptionId};
use crate::conversation::{
    domain::{ConversationEvent, EventChannel},
    ports::ConversationEventSink,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, info, warn};

/// Errors returned by hub operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HubError {
    /// The hub has not been started or has been stopped.
    #[error("broadcast hub is not running")]
    Stopped,
}

/// Tunables for listener queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Queue capacity per listener.
    pub subscriber_buffer: usize,
    /// Dropped events after which a listener is disconnected.
    pub max_subscriber_drops: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
            max_subscriber_drops: 100,
        }
    }
}

/// Receiving side of one subscription.
///
/// Dropping it unsubscribes: the listener is removed from the hub at once.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    channel: EventChannel,
    receiver: mpsc::Receiver<Arc<EventEnvelope>>,
    listeners: Weak<RwLock<Listeners>>,
}

impl Subscription {
    /// Returns the subscription handle.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the subscribed channel.
    #[must_use]
    pub const fn channel(&self) -> EventChannel {
        self.channel
    }

    /// Waits for the next event. Returns `None` once the hub has let go of
    /// the listener.
    pub async fn recv(&mut self) -> Option<Arc<EventEnvelope>> {
        self.receiver.recv().await
    }

    /// Returns the next queued event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] when nothing is queued and
    /// [`TryRecvError::Disconnected`] once the hub has let go of the listener.
    pub fn try_recv(&mut self) -> Result<Arc<EventEnvelope>, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut table = listeners.write().unwrap_or_else(PoisonError::into_inner);
        if remove_listeners(&mut table, &self.channel, &[self.id]) {
            debug!(subscription = %self.id, channel = %self.channel, "dropped subscription released");
        }
    }
}

#[derive(Debug)]
struct Listener {
    id: SubscriptionId,
    sender: mpsc::Sender<Arc<EventEnvelope>>,
    drops: AtomicU64,
}

type Listeners = HashMap<EventChannel, Vec<Arc<Listener>>>;

/// Removes `ids` from `channel`, forgetting the channel once it is empty.
fn remove_listeners(
    listeners: &mut Listeners,
    channel: &EventChannel,
    ids: &[SubscriptionId],
) -> bool {
    let Some(channel_listeners) = listeners.get_mut(channel) else {
        return false;
    };
    let before = channel_listeners.len();
    channel_listeners.retain(|listener| !ids.contains(&listener.id));
    let removed = channel_listeners.len() != before;
    if channel_listeners.is_empty() {
        listeners.remove(channel);
    }
    removed
}

/// Explicitly started and stopped event fan-out.
pub struct BroadcastHub<C>
where
    C: Clock + Send + Sync,
{
    listeners: Arc<RwLock<Listeners>>,
    running: AtomicBool,
    config: HubConfig,
    clock: Arc<C>,
}

impl<C> BroadcastHub<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a stopped hub.
    #[must_use]
    pub fn new(config: HubConfig, clock: Arc<C>) -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
            running: AtomicBool::new(false),
            config,
            clock,
        }
    }

    /// Starts accepting subscriptions and delivering events.
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::AcqRel) {
            info!("broadcast hub started");
        }
    }

    /// Stops delivery and closes every subscription.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            let dropped: usize = {
                let mut listeners = self.write_listeners();
                let count = listeners.values().map(Vec::len).sum();
                listeners.clear();
                count
            };
            info!(listeners = dropped, "broadcast hub stopped");
        }
    }

    /// Returns `true` between [`Self::start`] and [`Self::stop`].
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Registers a listener on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Stopped`] when the hub is not running.
    pub fn subscribe(&self, channel: EventChannel) -> Result<Subscription, HubError> {
        if !self.is_running() {
            return Err(HubError::Stopped);
        }
        let (sender, receiver) = mpsc::channel(self.config.subscriber_buffer.max(1));
        let id = SubscriptionId::new();
        self.write_listeners()
            .entry(channel)
            .or_default()
            .push(Arc::new(Listener {
                id,
                sender,
                drops: AtomicU64::new(0),
            }));
        debug!(subscription = %id, %channel, "listener subscribed");
        Ok(Subscription {
            id,
            channel,
            receiver,
            listeners: Arc::downgrade(&self.listeners),
        })
    }

    /// Removes a listener. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.write_listeners();
        let mut removed = false;
        listeners.retain(|_, channel_listeners| {
            let before = channel_listeners.len();
            channel_listeners.retain(|listener| listener.id != id);
            removed |= channel_listeners.len() != before;
            !channel_listeners.is_empty()
        });
        if removed {
            debug!(subscription = %id, "listener unsubscribed");
        }
        removed
    }

    /// Returns the number of listeners on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &EventChannel) -> usize {
        self.read_listeners().get(channel).map_or(0, Vec::len)
    }

    /// Returns the number of listeners across all channels.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.read_listeners().values().map(Vec::len).sum()
    }

    /// Delivers `event` to every current listener of `channel` without
    /// waiting.
    ///
    /// Returns the number of listeners that accepted the event.
    pub fn broadcast(&self, channel: &EventChannel, event: ConversationEvent) -> usize {
        if !self.is_running() {
            debug!(%channel, event = event.name(), "hub stopped, event discarded");
            return 0;
        }
        let envelope = Arc::new(EventEnvelope::new(*channel, event, self.clock.utc()));

        let mut delivered = 0;
        let mut to_remove = Vec::new();
        {
            let listeners = self.read_listeners();
            for listener in listeners.get(channel).into_iter().flatten() {
                match listener.sender.try_send(Arc::clone(&envelope)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        let drops = listener.drops.fetch_add(1, Ordering::Relaxed) + 1;
                        if drops >= self.config.max_subscriber_drops {
                            warn!(subscription = %listener.id, %channel, drops, "broadcast delivery failure, disconnecting slow listener");
                            to_remove.push(listener.id);
                        } else {
                            warn!(subscription = %listener.id, %channel, total_drops = drops, "broadcast delivery failure, listener queue full");
                        }
                    }
                    Err(TrySendError::Closed(_)) => to_remove.push(listener.id),
                }
            }
            debug!(%channel, event = %envelope.name, delivered, "broadcast event");
        }

        if !to_remove.is_empty() {
            remove_listeners(&mut self.write_listeners(), channel, &to_remove);
        }
        delivered
    }

    fn read_listeners(&self) -> RwLockReadGuard<'_, Listeners> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_listeners(&self) -> RwLockWriteGuard<'_, Listeners> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> ConversationEventSink for BroadcastHub<C>
where
    C: Clock + Send + Sync,
{
    fn publish(&self, channel: &EventChannel, event: ConversationEvent) {
        self.broadcast(channel, event);
    }
}
