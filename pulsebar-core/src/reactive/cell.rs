//! Broadcast Cell Implementation
//!
//! A broadcast cell holds exactly one value and tells its subscribers when
//! that value has been replaced.
//!
//! # How Cells Work
//!
//! 1. `set` stores the new value and bumps a generation counter while the
//!    value lock is held, so concurrent writers are serialized and the last
//!    one wins.
//!
//! 2. After the lock is released every live subscriber gets a single wakeup
//!    permit. Permits do not stack: a subscriber that misses several sets
//!    wakes once and reads the latest value with `get`.
//!
//! 3. A subscription only ever observes sets that happened after it was
//!    created.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock`. Writers hold it only long
//! enough to swap the value, and fan-out never waits on a subscriber, so a
//! slow subscriber cannot hold up `set`.
//!
//! This is not a queue. Only the latest value is ever retrievable.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::subscriber::{Registry, Subscription};

/// A single-slot value with get/set/subscribe.
///
/// [`BroadcastCell`] is the only implementation. Code that only needs to
/// read, write or watch a slot can take `&dyn Value<T>` instead of the
/// concrete cell.
pub trait Value<T>: Send + Sync {
    /// Get the current value. Never blocks on writers for longer than a
    /// swap.
    fn get(&self) -> T;

    /// Replace the current value and signal every live subscriber once.
    fn set(&self, value: T);

    /// Subscribe to change signals for sets that happen after this call.
    fn subscribe(&self) -> Subscription;
}

/// Broadcast value cell holding a value of type `T`.
///
/// Cloning a cell yields another handle to the same slot.
///
/// # Example
///
/// ```rust
/// use pulsebar_core::reactive::BroadcastCell;
///
/// let cell = BroadcastCell::new(0);
/// let sub = cell.subscribe();
///
/// cell.set(1);
/// cell.set(2);
///
/// assert!(sub.has_changed());
/// assert_eq!(cell.get(), 2);
/// ```
pub struct BroadcastCell<T> {
    value: Arc<RwLock<T>>,
    registry: Arc<Registry>,
}

impl<T> BroadcastCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new cell with the given initial value at generation 0.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            registry: Arc::new(Registry::default()),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Store a new value and notify subscribers.
    ///
    /// Returns the generation assigned to this write.
    pub fn set(&self, value: T) -> u64 {
        let generation = {
            let mut guard = self.value.write();
            *guard = value;
            self.registry.advance()
        };
        self.registry.notify_all();
        generation
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> u64
    where
        F: FnOnce(&T) -> T,
    {
        let generation = {
            let mut guard = self.value.write();
            let next = f(&guard);
            *guard = next;
            self.registry.advance()
        };
        self.registry.notify_all();
        generation
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }
}

impl<T> BroadcastCell<T> {
    /// Number of sets since the cell was created.
    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscriber_count()
    }
}

impl<T> Value<T> for BroadcastCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        BroadcastCell::get(self)
    }

    fn set(&self, value: T) {
        BroadcastCell::set(self, value);
    }

    fn subscribe(&self) -> Subscription {
        BroadcastCell::subscribe(self)
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for BroadcastCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for BroadcastCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Debug for BroadcastCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastCell")
            .field("value", &*self.value.read())
            .field("generation", &self.registry.generation())
            .field("subscriber_count", &self.registry.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        #[test]
        fn any_set_sequence_signals_once_and_keeps_last(
            values in proptest::collection::vec(any::<u64>(), 0..64)
        ) {
            let cell = BroadcastCell::new(0u64);
            let mut sub = cell.subscribe();

            for value in &values {
                cell.set(*value);
            }

            let expected = if values.is_empty() { None } else { Some(true) };
            prop_assert_eq!(sub.changed().now_or_never(), expected);
            prop_assert_eq!(cell.get(), values.last().copied().unwrap_or(0));
            prop_assert_eq!(cell.generation(), values.len() as u64);

            // Drained: the burst produced exactly one signal.
            prop_assert!(sub.changed().now_or_never().is_none());
        }
    }

    #[test]
    fn cell_get_and_set() {
        let cell = BroadcastCell::new(0);
        assert_eq!(cell.get(), 0);

        cell.set(42);
        assert_eq!(cell.get(), 42);
        assert_eq!(cell.generation(), 1);
    }

    #[test]
    fn cell_update() {
        let cell = BroadcastCell::new(10);
        cell.update(|v| v + 5);
        assert_eq!(cell.get(), 15);
    }

    #[test]
    fn cell_clone_shares_state() {
        let cell1 = BroadcastCell::new(0);
        let cell2 = cell1.clone();

        cell1.set(42);
        assert_eq!(cell2.get(), 42);

        cell2.set(100);
        assert_eq!(cell1.get(), 100);
        assert_eq!(cell1.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_sets_collapse_into_one_signal() {
        let cell = BroadcastCell::new(0);
        let mut sub = cell.subscribe();

        cell.set(1);
        cell.set(2);
        cell.set(3);

        assert!(sub.changed().await);
        assert_eq!(cell.get(), 3);

        // Nothing else is pending.
        assert!(!sub.has_changed());
        let pending = tokio::time::timeout(Duration::from_millis(100), sub.changed()).await;
        assert!(pending.is_err());
    }

    #[test]
    fn late_subscriber_does_not_see_earlier_sets() {
        let cell = BroadcastCell::new("a");
        cell.set("b");

        let sub = cell.subscribe();
        assert!(!sub.has_changed());

        cell.set("c");
        assert!(sub.has_changed());
    }

    #[test]
    fn every_subscriber_is_signalled() {
        let cell = BroadcastCell::new(0);
        let subs: Vec<_> = (0..4).map(|_| cell.subscribe()).collect();

        cell.set(7);
        assert!(subs.iter().all(|s| s.has_changed()));
    }

    #[tokio::test]
    async fn cancelled_subscriber_gets_nothing_further() {
        let cell = BroadcastCell::new(0);
        let mut sub = cell.subscribe();

        cell.set(1);
        sub.cancel();
        cell.set(2);

        assert!(!sub.changed().await);
        assert_eq!(cell.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn waiting_subscriber_wakes_on_set_from_other_task() {
        let cell = BroadcastCell::new(0u32);
        let mut sub = cell.subscribe();

        let writer = cell.clone();
        let task = tokio::spawn(async move {
            writer.set(9);
        });

        assert!(sub.changed().await);
        assert_eq!(cell.get(), 9);
        task.await.unwrap();
    }

    #[test]
    fn concurrent_writers_last_generation_wins() {
        let cell = BroadcastCell::new(0usize);
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let cell = cell.clone();
                std::thread::spawn(move || cell.set(i))
            })
            .collect();

        let mut writes: Vec<(u64, usize)> = handles
            .into_iter()
            .zip(1..=8)
            .map(|(h, i)| (h.join().unwrap(), i))
            .collect();
        writes.sort();

        assert_eq!(cell.generation(), 8);
        assert_eq!(cell.get(), writes.last().unwrap().1);
    }
}
