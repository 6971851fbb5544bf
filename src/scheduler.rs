//! Periodic timers driven from the control loop.
//!
//! The loop has no timer interrupts of its own; it passes the current
//! uptime into [`IntervalTimer::poll`] every tick and acts when the timer
//! reports that a period has elapsed. Used for the retained heartbeat and
//! the WiFi re-association retry.

use log::debug;

/// Fires at most once per `interval_ms`, measured from the last firing.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    label: &'static str,
    interval_ms: u64,
    last_fired_ms: u64,
}

impl IntervalTimer {
    /// The first firing happens one full interval after `start_ms`.
    pub fn new(label: &'static str, interval_ms: u64, start_ms: u64) -> Self {
        Self {
            label,
            interval_ms,
            last_fired_ms: start_ms,
        }
    }

    /// Returns `true` if the interval has elapsed, and restarts the period
    /// from `now_ms`. A late poll does not cause catch-up firings.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_ms) < self.interval_ms {
            return false;
        }
        debug!("Timer '{}' fired at {} ms", self.label, now_ms);
        self.last_fired_ms = now_ms;
        true
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}
