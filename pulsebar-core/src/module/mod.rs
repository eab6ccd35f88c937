//! Polling Modules
//!
//! A polling module ties together a [`StateFetcher`], an optional
//! [`ActionTrigger`], a swappable render function and a [`Scheduler`], and
//! publishes its rendering through a [`BroadcastCell`].
//!
//! [`Scheduler`]: crate::timing::Scheduler
//! [`BroadcastCell`]: crate::reactive::BroadcastCell

mod polling;
mod source;

pub use polling::{Phase, PollingModule, RenderFn};
pub use source::{ActionTrigger, Degrading, FnAction, FnFetcher, NoAction, StateFetcher, TryFetch};
