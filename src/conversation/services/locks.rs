//! Keyed async locks with a drain gate for graceful shutdown.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, RwLock};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// One async mutex per key, created on demand and dropped once unused.
///
/// Every guard also holds a read lease on a drain gate; [`LockTable::shutdown`]
/// refuses new leases and waits for outstanding ones.
#[derive(Debug)]
pub(crate) struct LockTable<K> {
    slots: Slots<K>,
    drain: Arc<RwLock<()>>,
    closing: AtomicBool,
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            drain: Arc::new(RwLock::new(())),
            closing: AtomicBool::new(false),
        }
    }

    /// Waits for exclusive access to `key`.
    ///
    /// Returns `None` once shutdown has started.
    pub(crate) async fn acquire(&self, key: K) -> Option<KeyGuard<K>> {
        if self.closing.load(Ordering::Acquire) {
            return None;
        }
        let lease = Arc::clone(&self.drain).read_owned().await;
        if self.closing.load(Ordering::Acquire) {
            return None;
        }
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        Some(KeyGuard {
            key,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
            _lease: lease,
        })
    }

    /// Stops handing out guards and waits until every held guard is dropped.
    pub(crate) async fn shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        let _drained = self.drain.write().await;
    }

    /// Returns `true` once shutdown has started.
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn tracked_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one key. Dropping it releases the key.
pub(crate) struct KeyGuard<K>
where
    K: Eq + Hash,
{
    key: K,
    slots: Slots<K>,
    guard: Option<OwnedMutexGuard<()>>,
    _lease: OwnedRwLockReadGuard<()>,
}

impl<K> Drop for KeyGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
