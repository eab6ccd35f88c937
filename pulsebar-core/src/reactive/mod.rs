//! Reactive Primitives
//!
//! This module implements the broadcast value cell and its subscriptions.
//! Every piece of shared state in a polling module (the rendered output, the
//! fetched state, the render function, the scheduler interval) lives in one
//! of these cells.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`BroadcastCell`] holds exactly one value. Reads never wait for
//! subscribers and writes never wait for readers.
//!
//! ## Subscriptions
//!
//! A [`Subscription`] receives a collapsing change signal: however many sets
//! happen while the subscriber is busy, it wakes up once and reads the
//! latest value. It is an edge signal, not a message queue.

mod cell;
mod subscriber;

pub use cell::{BroadcastCell, Value};
pub use subscriber::{Canceller, SubscriberId, Subscription};
