//! CarTag firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Tasks:
//! - `softdevice_task`: SoftDevice event pump.
//! - `advertising_task`: advertising + GATT server, one central at a time.
//! - `report_task`: 10 ms poll loop driving the lifecycle manager and the
//!   battery report scheduler.

#![no_std]
#![no_main]

mod ble;

use cartag::config;
use cartag::{CarTag, ConnectionState, LifecycleConfig, LinkEvents, ReportConfig};
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::interrupt::Priority;
use embassy_time::{Duration, Instant, Ticker};
use nrf_softdevice::Softdevice;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::driver::SoftdeviceStack;
use crate::ble::Server;

static CONNECTION: ConnectionState = ConnectionState::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting CarTag BLE...");

    // Priorities 0, 1 and 4 are reserved by the SoftDevice.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let _p = embassy_nrf::init(nrf_config);

    let sd = ble::enable_softdevice();
    let server = ble::init_server(sd);
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(ble::softdevice_task(sd)));

    let lifecycle = LifecycleConfig::default();
    let events = LinkEvents::new(&CONNECTION, lifecycle.conn_params);
    unwrap!(spawner.spawn(ble::advertising_task(sd, server, events)));
    unwrap!(spawner.spawn(report_task(server, lifecycle)));
}

#[embassy_executor::task]
async fn report_task(server: &'static Server, lifecycle: LifecycleConfig) -> ! {
    let mut stack = SoftdeviceStack::new(server, &CONNECTION);
    let mut tag = unwrap!(CarTag::new(&CONNECTION, lifecycle, ReportConfig::default()));
    tag.start(&mut stack);
    info!("Device name: {}", config::DEVICE_NAME);

    let mut ticker = Ticker::every(Duration::from_millis(config::TICK_MS));
    loop {
        tag.poll(Instant::now().as_millis(), &mut stack);
        ticker.next().await;
    }
}
