//! Periodic Scheduler
//!
//! The scheduler keeps its interval in a [`BroadcastCell`], so a running
//! [`Ticker`] learns about reconfiguration through the same change signal
//! the rest of the crate uses.
//!
//! # Algorithm
//!
//! 1. The ticker builds a `tokio::time::Interval` whose first deadline is one
//!    period from now (the module has already fetched on entry).
//! 2. `tick()` waits on both the interval and the configuration signal.
//! 3. A configuration change rebuilds the interval from the current instant;
//!    it never shortens or stretches a period retroactively.
//! 4. Missed deadlines use `MissedTickBehavior::Delay`: one tick is
//!    delivered immediately and the next deadline is a full period later.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::reactive::{BroadcastCell, Subscription};

/// Shared, reconfigurable tick interval.
///
/// Cloning yields another handle to the same configuration.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    interval: BroadcastCell<Option<Duration>>,
}

impl Scheduler {
    /// Create a scheduler with no interval. Its tickers never fire until
    /// [`every`](Self::every) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler that ticks every `interval`.
    pub fn with_interval(interval: Duration) -> Self {
        let scheduler = Self::new();
        scheduler.every(interval);
        scheduler
    }

    /// Set the tick interval. Running tickers switch over on their next
    /// tick computation.
    ///
    /// A zero interval stops ticking.
    pub fn every(&self, interval: Duration) -> &Self {
        if interval.is_zero() {
            warn!("zero scheduler interval; ticking stopped");
            self.interval.set(None);
        } else {
            debug!(?interval, "scheduler interval set");
            self.interval.set(Some(interval));
        }
        self
    }

    /// Get the current interval, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.interval.get()
    }

    /// Create the consumer side of this scheduler.
    pub fn ticker(&self) -> Ticker {
        let changes = self.interval.subscribe();
        let mut ticker = Ticker {
            config: self.interval.clone(),
            changes,
            interval: None,
        };
        ticker.rebuild();
        ticker
    }
}

enum Wake {
    Tick,
    Reconfigured(bool),
}

/// Consumer side of a [`Scheduler`].
///
/// Holds at most one pending tick.
#[derive(Debug)]
pub struct Ticker {
    config: BroadcastCell<Option<Duration>>,
    changes: Subscription,
    interval: Option<Interval>,
}

impl Ticker {
    /// Wait for the next tick.
    ///
    /// Cancel safe: dropping the future loses no tick and no
    /// reconfiguration.
    pub async fn tick(&mut self) {
        loop {
            let wake = match self.interval.as_mut() {
                Some(interval) => tokio::select! {
                    _ = interval.tick() => Wake::Tick,
                    alive = self.changes.changed() => Wake::Reconfigured(alive),
                },
                None => Wake::Reconfigured(self.changes.changed().await),
            };

            match wake {
                Wake::Tick => return,
                Wake::Reconfigured(true) => self.rebuild(),
                // The ticker owns its subscription, so this only happens
                // if the scheduler side is torn down under us.
                Wake::Reconfigured(false) => std::future::pending::<()>().await,
            }
        }
    }

    /// Current period, if ticking.
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }

    fn rebuild(&mut self) {
        self.interval = self.config.get().map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
    }
}
