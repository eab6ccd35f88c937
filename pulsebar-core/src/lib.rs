//! Pulsebar Core
//!
//! This crate provides the building blocks of a status bar whose items keep
//! themselves up to date. It implements:
//!
//! - A broadcast value cell with collapsing change signals
//! - A reconfigurable periodic scheduler with tick coalescing
//! - Reactive polling modules that fetch, render and publish
//! - Adapters for systemd user services and Shelly relays
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the broadcast cell and its subscriptions
//! - `timing`: the periodic scheduler
//! - `module`: state fetchers, action triggers and the polling loop
//! - `adapters`: concrete modules and the type-erased [`adapters::BarModule`]
//! - `modal`: the mode controller handle
//! - `output`: segments and colors produced by render functions
//! - `config`: figment-based bar configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use pulsebar_core::adapters::systemd;
//!
//! let module = systemd::user_service("syncthing");
//! let output = module.output();
//! module.spawn();
//!
//! let mut changes = output.subscribe();
//! while changes.changed().await {
//!     println!("{:?}", output.get());
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod modal;
pub mod module;
pub mod output;
pub mod reactive;
pub mod timing;

pub use error::{ColorError, ConfigError, FetchError};
