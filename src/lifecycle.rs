//! Connection lifecycle manager.
//!
//! Split in two halves that share one [`ConnectionState`]:
//!
//! - [`LinkEvents`] is handed to the BLE driver and implements the observer
//!   traits. It runs in the stack's callback context and only flips flags.
//! - [`LifecycleManager`] runs in the poll loop. It detects connect and
//!   disconnect edges and re-arms advertising one settle delay after every
//!   disconnect, as a deferred action rather than a blocking wait.

use heapless::Deque;

use crate::config;
use crate::inbound::WritePayload;
use crate::link::{ConnectionState, LinkEdge};
use crate::stack::{BleStack, ConnParams};

/// Advertising restarts that can be outstanding at once.
const MAX_PENDING_RESTARTS: usize = 8;

/// Receives link-level connection events from the BLE stack.
pub trait ConnectionObserver {
    /// A central completed connection setup. Returns parameters the driver
    /// should request from the central, if any. The request is a hint.
    fn on_connect(&self) -> Option<ConnParams>;

    /// The link was lost or closed.
    fn on_disconnect(&self);
}

/// Receives characteristic writes from the BLE stack.
pub trait WriteObserver {
    /// Must not block. Zero-length payloads are ignored.
    fn on_write(&self, data: &[u8]);
}

/// Receives notification subscription changes (CCCD writes).
pub trait SubscriptionObserver {
    fn on_subscribe(&self, notifications: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Pause between a disconnect and the advertising restart.
    pub settle_delay_ms: u64,
    /// Connection parameters to request after connect. `None` keeps the
    /// central's choice.
    pub conn_params: Option<ConnParams>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: config::SETTLE_DELAY_MS,
            conn_params: Some(config::CONN_PARAMS),
        }
    }
}

/// Callback-side handle given to the BLE driver.
#[derive(Clone, Copy)]
pub struct LinkEvents<'a> {
    state: &'a ConnectionState,
    conn_params: Option<ConnParams>,
}

impl<'a> LinkEvents<'a> {
    pub fn new(state: &'a ConnectionState, conn_params: Option<ConnParams>) -> Self {
        Self { state, conn_params }
    }
}

impl ConnectionObserver for LinkEvents<'_> {
    fn on_connect(&self) -> Option<ConnParams> {
        self.state.set_connected(true);
        info!("Device connected");
        self.conn_params
    }

    fn on_disconnect(&self) {
        self.state.set_connected(false);
        info!("Device disconnected");
    }
}

impl WriteObserver for LinkEvents<'_> {
    fn on_write(&self, data: &[u8]) {
        // Command parsing hooks in here.
        match WritePayload::classify(data) {
            WritePayload::Empty => {}
            WritePayload::Text(text) => info!("Received value: {}", text),
            WritePayload::Binary(bytes) => info!("Received {} bytes: {:?}", bytes.len(), bytes),
        }
    }
}

impl SubscriptionObserver for LinkEvents<'_> {
    fn on_subscribe(&self, notifications: bool) {
        self.state.set_notifications(notifications);
        info!("Battery notifications: {}", notifications);
    }
}

/// Poll-side half of the lifecycle manager.
pub struct LifecycleManager<'a> {
    state: &'a ConnectionState,
    config: LifecycleConfig,
    /// Deadlines of scheduled advertising restarts, oldest first.
    readvertise_at: Deque<u64, MAX_PENDING_RESTARTS>,
    /// Set once the first disconnect edge has been seen.
    had_link_loss: bool,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(state: &'a ConnectionState, config: LifecycleConfig) -> Self {
        Self {
            state,
            config,
            readvertise_at: Deque::new(),
            had_link_loss: false,
        }
    }

    pub fn events(&self) -> LinkEvents<'a> {
        LinkEvents::new(self.state, self.config.conn_params)
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Connected both at the last edge check and right now. A callback
    /// landing mid-tick is picked up on the next edge check instead.
    pub fn link_up(&self) -> bool {
        self.state.was_connected() && self.state.is_connected()
    }

    pub fn readvertise_pending(&self) -> bool {
        !self.readvertise_at.is_empty()
    }

    /// Run edge detection, then any deferred action that is due.
    /// At most one of the two happens per call.
    ///
    /// Every disconnect edge gets exactly one advertising restart, also when
    /// a central reconnects before the settle delay is over.
    pub fn poll<S: BleStack>(&mut self, now_ms: u64, stack: &mut S) -> LifecycleStep {
        match self.state.take_edge() {
            Some(LinkEdge::Disconnected) => {
                self.had_link_loss = true;
                self.schedule_restart(now_ms);
                return LifecycleStep::Disconnected;
            }
            Some(LinkEdge::Connected) if self.had_link_loss => return LifecycleStep::Reconnected,
            Some(LinkEdge::Connected) => return LifecycleStep::Connected,
            None => {}
        }

        match self.readvertise_at.front() {
            Some(&deadline) if now_ms >= deadline => {
                self.readvertise_at.pop_front();
                match stack.restart_advertising() {
                    Ok(()) => info!("Restarted advertising"),
                    Err(e) => error!("Advertising restart failed: {:?}", e),
                }
                LifecycleStep::Advertised
            }
            _ => LifecycleStep::Nothing,
        }
    }

    fn schedule_restart(&mut self, now_ms: u64) {
        let deadline = now_ms.saturating_add(self.config.settle_delay_ms);
        match self.readvertise_at.push_back(deadline) {
            Ok(()) => debug!("Advertising restart scheduled at {} ms", deadline),
            // Restarts still queued will bring advertising back.
            Err(_) => warn!("Too many pending advertising restarts, dropping one"),
        }
    }
}

/// Outcome of one [`LifecycleManager::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleStep {
    Nothing,
    /// First link since boot.
    Connected,
    /// A link following an earlier disconnect.
    Reconnected,
    Disconnected,
    /// A scheduled advertising restart was performed (or attempted).
    Advertised,
}
