//! CarTag BLE peripheral core.
//!
//! The connection lifecycle state machine and the periodic battery report
//! scheduler, written against the [`stack::BleStack`] seam so they can be
//! tested on the host (no embedded hardware required).
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary (`--features embedded`) uses main.rs with
//! #![no_std] and #![no_main] and binds this core to the SoftDevice.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod app;
pub mod config;
pub mod error;
pub mod inbound;
pub mod lifecycle;
pub mod link;
pub mod report;
pub mod stack;

pub use app::{CarTag, TickAction};
pub use error::{BleError, Error};
pub use lifecycle::{
    ConnectionObserver, LifecycleConfig, LinkEvents, SubscriptionObserver, WriteObserver,
};
pub use link::ConnectionState;
pub use report::ReportConfig;
pub use stack::{BleStack, ConnParams};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - combined core
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::mock::MockStack;

    fn tag(state: &ConnectionState) -> CarTag<'_> {
        CarTag::new(state, LifecycleConfig::default(), ReportConfig::default()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Startup
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn start_sets_greeting_and_advertises() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let mut stack = MockStack::default();
        tag.start(&mut stack);
        assert_eq!(stack.value_str(), "Hello from CarTag!");
        assert_eq!(stack.advertise_starts, 1);
        assert!(stack.notified.is_empty());
    }

    #[test]
    fn start_survives_stack_failures() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let mut stack = MockStack {
            fail_set_value: true,
            fail_advertise: true,
            ..Default::default()
        };
        tag.start(&mut stack);
        assert_eq!(tag.poll(10, &mut stack), TickAction::Idle);
    }

    #[test]
    fn new_rejects_invalid_report_config() {
        let state = ConnectionState::new();
        let bad = ReportConfig {
            decay_cadence: 0,
            ..Default::default()
        };
        assert_eq!(
            CarTag::new(&state, LifecycleConfig::default(), bad).err(),
            Some(Error::InvalidConfig)
        );
    }

    // ════════════════════════════════════════════════════════════════════════
    // Tick sequencing
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn idle_until_connected() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let mut stack = MockStack::default();
        for t in (0..10_000).step_by(10) {
            assert_eq!(tag.poll(t, &mut stack), TickAction::Idle);
        }
        assert!(stack.notified.is_empty());
    }

    #[test]
    fn first_connect_counts_interval_from_boot() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        events.on_connect();
        assert_eq!(tag.poll(2000, &mut stack), TickAction::Reported(100));
        assert_eq!(tag.poll(2010, &mut stack), TickAction::Waiting);
        assert_eq!(tag.poll(4000, &mut stack), TickAction::Reported(100));
    }

    #[test]
    fn first_connect_before_interval_is_link_up() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        events.on_connect();
        assert_eq!(tag.poll(500, &mut stack), TickAction::LinkUp);
        assert_eq!(tag.poll(1990, &mut stack), TickAction::Waiting);
        assert_eq!(tag.poll(2000, &mut stack), TickAction::Reported(100));
    }

    #[test]
    fn disconnect_tick_then_advertise_tick() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        events.on_connect();
        tag.poll(0, &mut stack);
        events.on_disconnect();
        assert_eq!(tag.poll(1000, &mut stack), TickAction::LinkDown);
        assert_eq!(tag.poll(1200, &mut stack), TickAction::Idle);
        assert_eq!(tag.poll(1500, &mut stack), TickAction::Advertised);
        assert_eq!(tag.poll(1510, &mut stack), TickAction::Idle);
        assert_eq!(stack.advertise_restarts, 1);
    }

    #[test]
    fn reconnect_counts_interval_from_the_tick_that_latched_it() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        events.on_connect();
        tag.poll(0, &mut stack);
        events.on_disconnect();
        tag.poll(100, &mut stack);
        assert_eq!(tag.poll(600, &mut stack), TickAction::Advertised);

        // reconnected at ~t=600 but the edge is only latched at t=5000
        state.set_connected(true);
        assert_eq!(tag.poll(5000, &mut stack), TickAction::LinkUp);
        assert_eq!(tag.reports().last_update_ms(), 5000);
        assert_eq!(tag.poll(6990, &mut stack), TickAction::Waiting);
        assert_eq!(tag.poll(7000, &mut stack), TickAction::Reported(100));
    }

    #[test]
    fn write_during_connection_changes_nothing() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        events.on_connect();
        tag.poll(0, &mut stack);
        tag.poll(2000, &mut stack);
        let level = tag.battery_level();
        let count = tag.reports().update_count();

        events.on_write(&[]);
        events.on_write(b"unlock");

        assert_eq!(tag.battery_level(), level);
        assert_eq!(tag.reports().update_count(), count);
        assert!(tag.is_connected());
        assert_eq!(tag.poll(2010, &mut stack), TickAction::Waiting);
    }

    #[test]
    fn battery_never_increases_across_reconnects() {
        let state = ConnectionState::new();
        let mut tag = tag(&state);
        let events = tag.events();
        let mut stack = MockStack::default();

        let mut last = tag.battery_level();
        let mut now = 0;
        for cycle in 0..20u64 {
            events.on_connect();
            for _ in 0..(cycle % 7 + 1) * 250 {
                now += 10;
                tag.poll(now, &mut stack);
                assert!(tag.battery_level() <= last);
                assert!(tag.battery_level() <= 100);
                last = tag.battery_level();
            }
            events.on_disconnect();
            for _ in 0..100 {
                now += 10;
                tag.poll(now, &mut stack);
            }
        }
        assert!(last < 100);
    }
}
