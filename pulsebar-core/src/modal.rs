//! Mode Controller
//!
//! A bar can group its modules into named modes; at most one mode is
//! expanded at a time. The controller is an explicit handle: it is created
//! once by the host and cloned into whatever needs to switch modes (a click
//! handler, or a render function that updates a mode's icon).
//!
//! Both the active mode and each mode's icon live in broadcast cells, so a
//! host redraws by subscribing rather than polling.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::output::Segment;
use crate::reactive::{BroadcastCell, Subscription};

#[derive(Default)]
struct ModalInner {
    /// Mode name to its button icon, in registration order.
    modes: RwLock<IndexMap<String, BroadcastCell<Option<Segment>>>>,
    active: BroadcastCell<Option<String>>,
}

/// Handle for switching between modes.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone, Default)]
pub struct ModeController {
    inner: Arc<ModalInner>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mode. Registering an existing name is a no-op.
    pub fn add_mode(&self, name: impl Into<String>) -> &Self {
        self.inner
            .modes
            .write()
            .entry(name.into())
            .or_default();
        self
    }

    /// Registered mode names, in registration order.
    pub fn modes(&self) -> Vec<String> {
        self.inner.modes.read().keys().cloned().collect()
    }

    pub fn has_mode(&self, name: &str) -> bool {
        self.inner.modes.read().contains_key(name)
    }

    /// Expand `name`, or collapse it if it is already expanded.
    ///
    /// Returns `false` for an unknown mode.
    pub fn toggle(&self, name: &str) -> bool {
        if !self.known(name) {
            return false;
        }
        self.inner.active.update(|active| {
            if active.as_deref() == Some(name) {
                None
            } else {
                Some(name.to_string())
            }
        });
        true
    }

    /// Expand `name`, collapsing any other mode.
    ///
    /// Returns `false` for an unknown mode.
    pub fn activate(&self, name: &str) -> bool {
        if !self.known(name) {
            return false;
        }
        self.inner.active.set(Some(name.to_string()));
        true
    }

    /// Collapse every mode.
    pub fn reset(&self) {
        self.inner.active.set(None);
    }

    pub fn active(&self) -> Option<String> {
        self.inner.active.get()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.inner.active.get().as_deref() == Some(name)
    }

    /// Subscribe to changes of the active mode.
    pub fn subscribe(&self) -> Subscription {
        self.inner.active.subscribe()
    }

    /// Set the icon shown on a mode's button. `None` hides the button.
    ///
    /// Returns `false` for an unknown mode.
    pub fn set_icon(&self, name: &str, icon: Option<Segment>) -> bool {
        match self.icon_cell(name) {
            Some(cell) => {
                cell.set(icon);
                true
            }
            None => {
                debug!(mode = name, "icon for unknown mode ignored");
                false
            }
        }
    }

    pub fn icon(&self, name: &str) -> Option<Segment> {
        self.icon_cell(name).and_then(|cell| cell.get())
    }

    /// The cell holding a mode's icon, for subscribing to icon changes.
    pub fn icon_cell(&self, name: &str) -> Option<BroadcastCell<Option<Segment>>> {
        self.inner.modes.read().get(name).cloned()
    }

    fn known(&self, name: &str) -> bool {
        let known = self.has_mode(name);
        if !known {
            debug!(mode = name, "unknown mode");
        }
        known
    }
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("modes", &self.modes())
            .field("active", &self.active())
            .finish()
    }
}
