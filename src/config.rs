//! Application-wide constants and compile-time configuration.
//!
//! Identifiers, timing parameters, and payload limits live here so they
//! can be tuned in one place. The runtime config structs in `report` and
//! `lifecycle` take their defaults from these values.

use crate::stack::ConnParams;

// BLE identity

/// GAP device name, also carried in the advertising data.
pub const DEVICE_NAME: &str = "CarTag";

/// Custom service UUID. Wire-level identifier - must not change.
pub const SERVICE_UUID: &str = "4fafc201-1fb5-459e-8fcc-c5c9c331914b";

/// Battery/command characteristic UUID. Wire-level identifier - must not change.
pub const CHARACTERISTIC_UUID: &str = "beb5483e-36e1-4688-b7f5-ea07361b26a8";

/// Service UUID in the little-endian byte order used in advertising data.
pub const SERVICE_UUID_LE: [u8; 16] = 0x4fafc201_1fb5_459e_8fcc_c5c9c331914b_u128.to_le_bytes();

/// Characteristic value set once at startup, before any central connects.
pub const INITIAL_VALUE: &str = "Hello from CarTag!";

/// Maximum characteristic value length (bytes).
pub const VALUE_CAPACITY: usize = 20;

// Timing

/// Poll loop period (ms).
pub const TICK_MS: u64 = 10;

/// Time between battery reports while connected (ms).
pub const REPORT_INTERVAL_MS: u64 = 2000;

/// Number of reports between successive 1 % battery decrements.
pub const DECAY_CADENCE: u32 = 3;

/// Battery level reported after power-up (%).
pub const INITIAL_BATTERY_LEVEL: u8 = 100;

/// Pause after a disconnect before advertising resumes (ms).
pub const SETTLE_DELAY_MS: u64 = 500;

// Connection parameters requested after a central connects

/// Connection interval range (in 1.25 ms units). 24 = 30 ms, 48 = 60 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 48;

/// Slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// Supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// The full parameter hint, favouring link stability over power.
pub const CONN_PARAMS: ConnParams = ConnParams {
    min_interval: BLE_CONN_INTERVAL_MIN,
    max_interval: BLE_CONN_INTERVAL_MAX,
    latency: BLE_SLAVE_LATENCY,
    supervision_timeout: BLE_SUP_TIMEOUT,
};
