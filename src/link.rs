//! Shared connection state.
//!
//! Written from the stack's callback context and read from the poll loop,
//! so every flag is an atomic. `previously_connected` is only advanced by
//! [`ConnectionState::take_edge`], once per tick.
//!
//! A disconnect is additionally latched in `disconnect_pending` so that a
//! link which comes and goes between two ticks still produces a
//! [`LinkEdge::Disconnected`]. A connect has no such latch: a link that is
//! already gone by the next tick is never reported as connected.

use core::sync::atomic::{AtomicBool, Ordering};

/// A connection transition observed between two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEdge {
    Connected,
    Disconnected,
}

pub struct ConnectionState {
    connected: AtomicBool,
    previously_connected: AtomicBool,
    disconnect_pending: AtomicBool,
    notifications: AtomicBool,
}

impl ConnectionState {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            previously_connected: AtomicBool::new(false),
            disconnect_pending: AtomicBool::new(false),
            notifications: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        if !connected {
            self.notifications.store(false, Ordering::Release);
            self.disconnect_pending.store(true, Ordering::Release);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Level of `connected` as of the end of the previous tick.
    pub fn was_connected(&self) -> bool {
        self.previously_connected.load(Ordering::Acquire)
    }

    /// Central enabled or disabled notifications on the characteristic.
    /// Cleared on every disconnect.
    pub fn set_notifications(&self, enabled: bool) {
        self.notifications.store(enabled, Ordering::Release);
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.load(Ordering::Acquire)
    }

    /// Compare against the previous tick and latch the current level.
    ///
    /// A latched disconnect wins over the level comparison and latches
    /// "disconnected", so a link that was replaced within one tick shows
    /// up as a disconnect now and a connect on the following call.
    pub fn take_edge(&self) -> Option<LinkEdge> {
        if self.disconnect_pending.swap(false, Ordering::AcqRel) {
            self.previously_connected.store(false, Ordering::Release);
            return Some(LinkEdge::Disconnected);
        }

        let now = self.connected.load(Ordering::Acquire);
        let before = self.previously_connected.swap(now, Ordering::AcqRel);
        match (before, now) {
            (false, true) => Some(LinkEdge::Connected),
            (true, false) => Some(LinkEdge::Disconnected),
            _ => None,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
