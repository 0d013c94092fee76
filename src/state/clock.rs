//! Local countdown predicting the remaining time between authoritative snapshots.

use std::time::Duration;

/// Interval between two local decrements.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The countdown moved to the given number of seconds.
    Running(u32),
    /// The countdown just reached zero and stopped itself.
    Expired,
}

/// Straight-line countdown restarted from every snapshot.
///
/// The clock owns no timer: the runtime drives [`LocalClock::tick`] and watches
/// [`LocalClock::epoch`] to know when to re-arm or drop its single interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalClock {
    remaining: u32,
    running: bool,
    epoch: u64,
}

impl LocalClock {
    /// Create a stopped clock showing zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the countdown to `initial` seconds (negative values clamp to zero).
    ///
    /// Any previously scheduled tick is superseded. Returns the value now displayed.
    pub fn start(&mut self, initial: i64) -> u32 {
        self.remaining = u32::try_from(initial.max(0)).unwrap_or(u32::MAX);
        self.running = self.remaining > 0;
        self.epoch += 1;
        self.remaining
    }

    /// Advance by one second. Returns `None` when the clock is not running.
    pub fn tick(&mut self) -> Option<ClockTick> {
        if !self.running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            self.epoch += 1;
            return Some(ClockTick::Expired);
        }

        Some(ClockTick::Running(self.remaining))
    }

    /// Stop counting, keeping the last displayed value.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.epoch += 1;
        }
    }

    /// Seconds currently displayed.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether a tick is expected.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Changes every time the schedule changes (start, stop, expiry).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Format seconds as `MM:SS`.
pub fn format_mmss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
