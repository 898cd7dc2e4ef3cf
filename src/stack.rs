//! Seam to the BLE stack.
//!
//! The core never talks to the SoftDevice directly. Everything it needs
//! from the radio side goes through [`BleStack`], which the embedded
//! binary implements on top of `nrf-softdevice` and the tests implement
//! with a recorder.

use crate::error::BleError;

/// Primitives the core needs from the BLE peripheral stack.
pub trait BleStack {
    /// Replace the characteristic's current value.
    fn set_value(&mut self, value: &[u8]) -> Result<(), BleError>;

    /// Push the current value to the connected central.
    fn notify(&mut self) -> Result<(), BleError>;

    /// Begin connectable advertising.
    fn start_advertising(&mut self) -> Result<(), BleError>;

    /// Resume advertising after a link was lost.
    fn restart_advertising(&mut self) -> Result<(), BleError> {
        self.start_advertising()
    }
}

/// Link-layer connection parameters requested from the central.
///
/// Units follow the BLE spec: intervals in 1.25 ms, latency in
/// connection events, supervision timeout in 10 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub latency: u16,
    pub supervision_timeout: u16,
}
