//! Periodic battery report scheduler.
//!
//! While a central is connected the scheduler emits one report every
//! `interval_ms`. Every `decay_cadence` reports the simulated battery
//! level drops by 1 %, floored at 0. The payload is ASCII `"<level>%"`.

use core::fmt::Write;

use heapless::String;

use crate::config;
use crate::error::Error;
use crate::stack::BleStack;

/// Longest payload is `"100%"`.
pub const PAYLOAD_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportConfig {
    pub interval_ms: u64,
    pub decay_cadence: u32,
    pub initial_level: u8,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_ms: config::REPORT_INTERVAL_MS,
            decay_cadence: config::DECAY_CADENCE,
            initial_level: config::INITIAL_BATTERY_LEVEL,
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval_ms == 0 || self.decay_cadence == 0 || self.initial_level > 100 {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

pub struct ReportScheduler {
    config: ReportConfig,
    battery_level: u8,
    update_count: u32,
    last_update_ms: u64,
}

impl ReportScheduler {
    pub fn new(config: ReportConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            battery_level: config.initial_level,
            update_count: 0,
            last_update_ms: 0,
        })
    }

    pub fn battery_level(&self) -> u8 {
        self.battery_level
    }

    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms
    }

    /// Start a fresh interval at `now_ms`. Time spent disconnected is not
    /// caught up.
    pub fn restart(&mut self, now_ms: u64) {
        self.last_update_ms = now_ms;
    }

    /// Emit a report if the interval has elapsed. Returns the reported level.
    ///
    /// Must only be called while a central is connected.
    pub fn poll<S: BleStack>(&mut self, now_ms: u64, stack: &mut S) -> Option<u8> {
        if now_ms.saturating_sub(self.last_update_ms) < self.config.interval_ms {
            return None;
        }

        self.last_update_ms = now_ms;
        self.advance();

        let payload = format_level(self.battery_level);
        match stack.set_value(payload.as_bytes()) {
            Ok(()) => {
                if let Err(e) = stack.notify() {
                    warn!("Battery notify failed: {:?}", e);
                }
            }
            Err(e) => warn!("Battery value update failed: {:?}", e),
        }
        info!("Battery level: {}", payload.as_str());

        Some(self.battery_level)
    }

    fn advance(&mut self) {
        self.update_count += 1;
        if self.update_count >= self.config.decay_cadence {
            self.update_count = 0;
            self.battery_level = self.battery_level.saturating_sub(1);
        }
    }
}

/// Render a battery level as the characteristic payload, e.g. `"97%"`.
pub fn format_level(level: u8) -> String<PAYLOAD_CAPACITY> {
    let mut s = String::new();
    let _ = write!(&mut s, "{}%", level.min(100));
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::mock::MockStack;

    fn scheduler(config: ReportConfig) -> ReportScheduler {
        ReportScheduler::new(config).unwrap()
    }

    #[test]
    fn default_config_matches_constants() {
        let c = ReportConfig::default();
        assert_eq!(c.interval_ms, 2000);
        assert_eq!(c.decay_cadence, 3);
        assert_eq!(c.initial_level, 100);
    }

    #[test]
    fn rejects_degenerate_config() {
        let base = ReportConfig::default();
        for bad in [
            ReportConfig { interval_ms: 0, ..base },
            ReportConfig { decay_cadence: 0, ..base },
            ReportConfig { initial_level: 101, ..base },
        ] {
            assert_eq!(ReportScheduler::new(bad).err(), Some(Error::InvalidConfig));
        }
    }

    #[test]
    fn format_payloads() {
        assert_eq!(format_level(100).as_str(), "100%");
        assert_eq!(format_level(97).as_str(), "97%");
        assert_eq!(format_level(0).as_str(), "0%");
    }

    #[test]
    fn waits_for_full_interval() {
        let mut s = scheduler(ReportConfig::default());
        let mut stack = MockStack::default();
        s.restart(0);
        assert_eq!(s.poll(1990, &mut stack), None);
        assert_eq!(s.poll(2000, &mut stack), Some(100));
        assert_eq!(s.last_update_ms(), 2000);
        assert_eq!(s.poll(3999, &mut stack), None);
        assert_eq!(stack.notified, ["100%"]);
    }

    #[test]
    fn decrements_every_third_report() {
        let mut s = scheduler(ReportConfig::default());
        let mut stack = MockStack::default();
        s.restart(0);
        let levels: std::vec::Vec<u8> = (1..=6)
            .filter_map(|i| s.poll(i * 2000, &mut stack))
            .collect();
        assert_eq!(levels, [100, 100, 99, 99, 99, 98]);
        assert_eq!(stack.notified, ["100%", "100%", "99%", "99%", "99%", "98%"]);
        assert_eq!(s.update_count(), 0);
    }

    #[test]
    fn late_tick_does_not_fast_forward() {
        let mut s = scheduler(ReportConfig::default());
        let mut stack = MockStack::default();
        s.restart(0);
        // 10 s late still yields a single report
        assert_eq!(s.poll(12_000, &mut stack), Some(100));
        assert_eq!(s.poll(12_010, &mut stack), None);
        assert_eq!(s.update_count(), 1);
    }

    #[test]
    fn floors_at_zero_and_keeps_reporting() {
        let mut s = scheduler(ReportConfig {
            interval_ms: 10,
            decay_cadence: 1,
            initial_level: 2,
        });
        let mut stack = MockStack::default();
        let mut now = 0;
        for _ in 0..5 {
            now += 10;
            s.poll(now, &mut stack);
        }
        assert_eq!(s.battery_level(), 0);
        assert_eq!(stack.notified, ["1%", "0%", "0%", "0%", "0%"]);
        assert_eq!(s.last_update_ms(), 50);
    }

    #[test]
    fn set_value_failure_skips_notify_but_counts_report() {
        let mut s = scheduler(ReportConfig::default());
        let mut stack = MockStack {
            fail_set_value: true,
            ..Default::default()
        };
        s.restart(0);
        assert_eq!(s.poll(2000, &mut stack), Some(100));
        assert!(stack.notified.is_empty());
        assert_eq!(s.update_count(), 1);
        assert_eq!(s.last_update_ms(), 2000);
    }

    #[test]
    fn notify_failure_is_not_fatal() {
        let mut s = scheduler(ReportConfig::default());
        let mut stack = MockStack {
            fail_notify: true,
            ..Default::default()
        };
        s.restart(0);
        assert_eq!(s.poll(2000, &mut stack), Some(100));
        assert_eq!(stack.value_str(), "100%");
        assert_eq!(s.poll(4000, &mut stack), Some(100));
    }
}
