//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **GATT server** - one custom service with a single read/write/notify
//!    characteristic carrying the battery report.
//! 2. **Advertising task** - advertises when asked to, then runs the GATT
//!    server for the lifetime of the connection and forwards connect,
//!    disconnect and write events to the core's observers.
//! 3. **Stack driver** - [`driver::SoftdeviceStack`] implements the core's
//!    `BleStack` on top of the two tasks.
//!
//! The advertising task and the report task share the live connection
//! through [`LINK`] and advertise requests through [`ADVERTISE`].

pub mod driver;

use core::cell::RefCell;
use core::mem;

use cartag::config;
use cartag::{
    BleError, ConnParams, ConnectionObserver, LinkEvents, SubscriptionObserver, WriteObserver,
};
use defmt::{error, info, unwrap, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

/// Characteristic value as stored by the SoftDevice.
pub type StatusValue = Vec<u8, { config::VALUE_CAPACITY }>;

// UUID literals must match `config::SERVICE_UUID` and
// `config::CHARACTERISTIC_UUID`; the config tests check this file.
#[nrf_softdevice::gatt_service(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914b")]
pub struct CarTagService {
    /// Battery report out (notify), commands in (write).
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a8", read, write, notify)]
    pub status: StatusValue,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub tag: CarTagService,
}

/// Connection currently served, if any.
pub static LINK: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// Raised by the stack driver to (re)start advertising.
pub static ADVERTISE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Enable the SoftDevice with a single peripheral link named after the device.
pub fn enable_softdevice() -> &'static mut Softdevice {
    let config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as _,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    Softdevice::enable(&config)
}

/// Register the GATT server. Must run before the SoftDevice task starts.
pub fn init_server(sd: &mut Softdevice) -> &'static Server {
    static SERVER: StaticCell<Server> = StaticCell::new();
    SERVER.init(unwrap!(Server::new(sd)))
}

/// Ask the central for new connection parameters. The central may still
/// pick its own.
fn request_conn_params(conn: &Connection, params: ConnParams) -> Result<(), BleError> {
    info!(
        "requesting conn params: interval {}-{}, latency {}, timeout {}",
        params.min_interval, params.max_interval, params.latency, params.supervision_timeout
    );
    let raw_params = raw::ble_gap_conn_params_t {
        min_conn_interval: params.min_interval,
        max_conn_interval: params.max_interval,
        slave_latency: params.latency,
        conn_sup_timeout: params.supervision_timeout,
    };
    conn.set_conn_params(raw_params).map_err(|e| {
        warn!("set_conn_params error: {:?}", e);
        BleError::ConnParams
    })
}

/// Advertise on request, then serve one central until it disconnects.
#[embassy_executor::task]
pub async fn advertising_task(
    sd: &'static Softdevice,
    server: &'static Server,
    events: LinkEvents<'static>,
) -> ! {
    static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .full_name(config::DEVICE_NAME)
        .build();

    // Service UUID goes in the scan response.
    static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .services_128(ServiceList::Complete, &[config::SERVICE_UUID_LE])
        .build();

    loop {
        ADVERTISE.wait().await;

        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &peripheral::Config::default()).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("advertising failed: {:?}", e);
                continue;
            }
        };

        LINK.lock(|link| *link.borrow_mut() = Some(conn.clone()));

        if let Some(params) = events.on_connect() {
            // Keep the central's parameters if it refuses.
            let _ = request_conn_params(&conn, params);
        }

        let reason = gatt_server::run(&conn, server, |e| match e {
            ServerEvent::Tag(e) => match e {
                CarTagServiceEvent::StatusWrite(value) => events.on_write(&value),
                CarTagServiceEvent::StatusCccdWrite { notifications } => {
                    events.on_subscribe(notifications)
                }
            },
        })
        .await;

        LINK.lock(|link| *link.borrow_mut() = None);
        events.on_disconnect();
        info!("gatt server stopped: {:?}", reason);
    }
}
