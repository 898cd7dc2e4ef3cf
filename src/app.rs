//! Application core - ties the lifecycle manager and the report scheduler
//! to one poll step.
//!
//! ```text
//!   Idle ──on_connect──▶ Connected/Waiting ──interval──▶ Connected/Reporting
//!    ▲                        │  ▲                               │
//!    └──────on_disconnect─────┘  └────────────emit───────────────┘
//! ```
//!
//! Every disconnect schedules an advertising restart one settle delay later.

use crate::config;
use crate::error::Error;
use crate::lifecycle::{LifecycleConfig, LifecycleManager, LifecycleStep, LinkEvents};
use crate::link::ConnectionState;
use crate::report::{ReportConfig, ReportScheduler};
use crate::stack::BleStack;

/// What a single [`CarTag::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickAction {
    /// Disconnected, nothing due.
    Idle,
    /// Connect edge handled, no report due yet. On a reconnect the report
    /// interval was restarted.
    LinkUp,
    /// Disconnect edge handled; advertising restart scheduled.
    LinkDown,
    /// Deferred advertising restart performed (or attempted).
    Advertised,
    /// Connected, report interval not yet elapsed.
    Waiting,
    /// Battery report emitted with this level.
    Reported(u8),
}

pub struct CarTag<'a> {
    lifecycle: LifecycleManager<'a>,
    reports: ReportScheduler,
}

impl<'a> CarTag<'a> {
    pub fn new(
        state: &'a ConnectionState,
        lifecycle: LifecycleConfig,
        reports: ReportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            lifecycle: LifecycleManager::new(state, lifecycle),
            reports: ReportScheduler::new(reports)?,
        })
    }

    /// Observer handle for the BLE driver's callbacks.
    pub fn events(&self) -> LinkEvents<'a> {
        self.lifecycle.events()
    }

    pub fn battery_level(&self) -> u8 {
        self.reports.battery_level()
    }

    pub fn reports(&self) -> &ReportScheduler {
        &self.reports
    }

    pub fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    /// One-time startup: publish the greeting value and begin advertising.
    pub fn start<S: BleStack>(&mut self, stack: &mut S) {
        if let Err(e) = stack.set_value(config::INITIAL_VALUE.as_bytes()) {
            warn!("Initial value not set: {:?}", e);
        }
        match stack.start_advertising() {
            Ok(()) => info!("BLE device is ready and advertising as {}", config::DEVICE_NAME),
            Err(e) => error!("Advertising start failed: {:?}", e),
        }
    }

    /// Run one tick. Lifecycle work takes precedence; a report is only
    /// considered on ticks where the lifecycle performed no action.
    ///
    /// The first connect since boot is bookkeeping only: the interval keeps
    /// counting from boot and a report that is due goes out on the same
    /// tick. A reconnect restarts the interval at the tick that saw it.
    pub fn poll<S: BleStack>(&mut self, now_ms: u64, stack: &mut S) -> TickAction {
        let step = self.lifecycle.poll(now_ms, stack);
        match step {
            LifecycleStep::Reconnected => {
                self.reports.restart(now_ms);
                return TickAction::LinkUp;
            }
            LifecycleStep::Disconnected => return TickAction::LinkDown,
            LifecycleStep::Advertised => return TickAction::Advertised,
            LifecycleStep::Connected | LifecycleStep::Nothing => {}
        }

        if !self.lifecycle.link_up() {
            return TickAction::Idle;
        }

        match self.reports.poll(now_ms, stack) {
            Some(level) => TickAction::Reported(level),
            None if step == LifecycleStep::Connected => TickAction::LinkUp,
            None => TickAction::Waiting,
        }
    }
}
