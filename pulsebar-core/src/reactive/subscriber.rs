//! Subscriber types for broadcast cells.
//!
//! A subscription is the consumer side of a [`BroadcastCell`](super::BroadcastCell).
//! Each subscription owns a single-permit wakeup slot: any number of `set`
//! calls between two waits collapse into one wakeup, and the subscriber must
//! read the cell to see the latest value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Unique identifier for a subscriber.
///
/// Used as the key of a cell's subscriber registry so cancellation can find
/// the right slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-subscriber wakeup slot.
#[derive(Debug, Default)]
struct Slot {
    notify: Notify,
    cancelled: AtomicBool,
}

/// Generation counter plus the set of live subscribers of one cell.
///
/// This half of a cell does not depend on the value type, which keeps
/// [`Subscription`] non-generic.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    generation: AtomicU64,
    slots: Mutex<HashMap<SubscriberId, Arc<Slot>>>,
}

impl Registry {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Bump the generation. Callers hold the value lock so generation order
    /// matches write order.
    pub(crate) fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Wake every live subscriber once. `notify_one` stores at most one
    /// permit, so a subscriber that is not waiting never accumulates a
    /// backlog.
    pub(crate) fn notify_all(&self) {
        let slots = self.slots.lock();
        for slot in slots.values() {
            slot.notify.notify_one();
        }
    }

    pub(crate) fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId::new();
        let slot = Arc::new(Slot::default());
        // Read the generation under the registry lock: a concurrent `set`
        // either bumped it before (and is not observed) or will notify us.
        let seen = {
            let mut slots = self.slots.lock();
            slots.insert(id, Arc::clone(&slot));
            self.generation()
        };
        Subscription {
            id,
            seen,
            slot,
            registry: Arc::clone(self),
        }
    }

    fn remove(&self, id: SubscriberId) {
        self.slots.lock().remove(&id);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// A live subscription to a cell's change signal.
///
/// Dropping the subscription cancels it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    /// Last generation this subscriber has been told about.
    seen: u64,
    slot: Arc<Slot>,
    registry: Arc<Registry>,
}

impl Subscription {
    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait until the cell has been set since the last time this returned.
    ///
    /// Returns `false` once the subscription is cancelled; it never returns
    /// `true` for a set that happened after cancellation.
    pub async fn changed(&mut self) -> bool {
        loop {
            if self.slot.cancelled.load(Ordering::Acquire) {
                return false;
            }
            let current = self.registry.generation();
            if current > self.seen {
                self.seen = current;
                return true;
            }
            self.slot.notify.notified().await;
        }
    }

    /// Non-blocking check for an unobserved change.
    pub fn has_changed(&self) -> bool {
        !self.slot.cancelled.load(Ordering::Acquire) && self.registry.generation() > self.seen
    }

    /// Cancel this subscription. Idempotent.
    pub fn cancel(&self) {
        cancel_slot(&self.slot, self.id, &Arc::downgrade(&self.registry));
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.slot.cancelled.load(Ordering::Acquire)
    }

    /// Get a detached handle that can cancel this subscription from
    /// elsewhere.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            id: self.id,
            slot: Arc::clone(&self.slot),
            registry: Arc::downgrade(&self.registry),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Cancellation handle for a [`Subscription`].
///
/// Cloneable and safe to call any number of times.
#[derive(Debug, Clone)]
pub struct Canceller {
    id: SubscriberId,
    slot: Arc<Slot>,
    registry: Weak<Registry>,
}

impl Canceller {
    pub fn cancel(&self) {
        cancel_slot(&self.slot, self.id, &self.registry);
    }
}

fn cancel_slot(slot: &Slot, id: SubscriberId, registry: &Weak<Registry>) {
    if slot.cancelled.swap(true, Ordering::AcqRel) {
        return;
    }
    if let Some(registry) = registry.upgrade() {
        registry.remove(id);
    }
    // Wake a pending `changed()` so it can observe the cancellation.
    slot.notify.notify_one();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscription_starts_at_current_generation() {
        let registry = Arc::new(Registry::default());
        registry.advance();
        registry.advance();

        let sub = registry.subscribe();
        assert!(!sub.has_changed());

        registry.advance();
        assert!(sub.has_changed());
    }

    #[test]
    fn cancel_is_idempotent_and_unregisters() {
        let registry = Arc::new(Registry::default());
        let sub = registry.subscribe();
        let canceller = sub.canceller();
        assert_eq!(registry.subscriber_count(), 1);

        canceller.cancel();
        canceller.cancel();
        sub.cancel();

        assert!(sub.is_cancelled());
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn drop_unregisters() {
        let registry = Arc::new(Registry::default());
        let sub = registry.subscribe();
        assert_eq!(registry.subscriber_count(), 1);

        drop(sub);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_subscription_reports_closed() {
        let registry = Arc::new(Registry::default());
        let mut sub = registry.subscribe();

        sub.cancel();
        registry.advance();
        registry.notify_all();

        assert!(!sub.changed().await);
        assert!(!sub.has_changed());
    }
}
