//! `BleStack` over nrf-softdevice.
//!
//! The GATT value lives in the SoftDevice attribute table; a copy is kept
//! here because notifications carry the value explicitly.
//!
//! The CCCD starts out disabled on every connection. Until the central
//! subscribes, `notify` only updates the readable value and returns `Ok`.

use cartag::{BleError, BleStack, ConnectionState};
use defmt::{debug, warn};

use super::{Server, StatusValue, ADVERTISE, LINK};

pub struct SoftdeviceStack {
    server: &'static Server,
    state: &'static ConnectionState,
    value: StatusValue,
}

impl SoftdeviceStack {
    pub fn new(server: &'static Server, state: &'static ConnectionState) -> Self {
        Self {
            server,
            state,
            value: StatusValue::new(),
        }
    }
}

impl BleStack for SoftdeviceStack {
    fn set_value(&mut self, value: &[u8]) -> Result<(), BleError> {
        let value = StatusValue::from_slice(value).map_err(|_| BleError::ValueTooLong)?;
        self.server.tag.status_set(&value).map_err(|e| {
            warn!("status_set error: {:?}", e);
            BleError::SetValue
        })?;
        self.value = value;
        Ok(())
    }

    fn notify(&mut self) -> Result<(), BleError> {
        let conn = LINK
            .lock(|link| link.borrow().clone())
            .ok_or(BleError::NotConnected)?;
        if !self.state.notifications_enabled() {
            debug!("notifications disabled by central, value updated only");
            return Ok(());
        }
        self.server
            .tag
            .status_notify(&conn, &self.value)
            .map_err(|_| BleError::Notify)
    }

    fn start_advertising(&mut self) -> Result<(), BleError> {
        // The advertising task picks this up; failures surface in its log.
        ADVERTISE.signal(());
        Ok(())
    }

    fn restart_advertising(&mut self) -> Result<(), BleError> {
        // Only one link is configured. A live link gets its own
        // restart queued once it closes.
        if LINK.lock(|link| link.borrow().is_some()) {
            debug!("link up, advertising restart skipped");
            return Ok(());
        }
        self.start_advertising()
    }
}
