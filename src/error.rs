//! Unified error type for cartag.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (feature `defmt`) for efficient on-target logging.

/// Construction-time errors of the core. Runtime stack failures are
/// [`BleError`]s and are logged where they occur, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A report or lifecycle configuration value is out of range.
    InvalidConfig,
}

/// Failures reported by the BLE stack collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleError {
    /// Writing the characteristic value failed.
    SetValue,
    /// Notification could not be queued (CCCD disabled, buffers full, ...).
    Notify,
    /// Advertising could not be (re)started, e.g. radio not ready.
    Advertise,
    /// Connection parameter update request was rejected.
    ConnParams,
    /// No central is connected.
    NotConnected,
    /// Value does not fit the characteristic.
    ValueTooLong,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidConfig => f.write_str("invalid configuration"),
        }
    }
}

impl core::fmt::Display for BleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            BleError::SetValue => "set value failed",
            BleError::Notify => "notify failed",
            BleError::Advertise => "advertising failed",
            BleError::ConnParams => "connection parameter update rejected",
            BleError::NotConnected => "not connected",
            BleError::ValueTooLong => "value too long",
        };
        f.write_str(msg)
    }
}
