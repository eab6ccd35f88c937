//! Timing
//!
//! Periodic scheduling for polling modules.
//!
//! A [`Scheduler`] is the configuration side: it is shared with whoever owns
//! the module and can change the interval at any time. A [`Ticker`] is the
//! consumer side, owned by exactly one module loop, which waits on it for
//! the next tick.
//!
//! Ticks are coalesced. If the consumer is busy (a slow fetch, say) while
//! several periods elapse, it sees one pending tick when it next waits and
//! the schedule restarts from that moment. There is never a burst of
//! catch-up ticks after a stall.

mod scheduler;

pub use scheduler::{Scheduler, Ticker};
