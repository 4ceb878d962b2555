//! Wall-clock tick driver for the consumer thread.
//!
//! Each tick measures the real time since the previous one and hands the
//! consumer a variable delta plus the accumulated clock. Nothing downstream
//! assumes a fixed step; the rate only bounds how often the inbox is drained.

use std::time::{Duration, Instant};

use tracing::warn;

/// Default consumer tick rate.
pub const DEFAULT_TICK_HZ: u32 = 60;

/// Longest delta a single tick reports at normal rates. A stalled tick is
/// clamped rather than letting the consumer clock jump. Slow rates allow up
/// to two periods instead, so a healthy tick is never clamped.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Drives a callback at roughly `tick_hz` with a measured delta.
pub struct TickDriver {
    period: Duration,
    previous_time: Instant,
    elapsed: f64,
    tick_count: u64,
}

impl TickDriver {
    /// A driver targeting `tick_hz` ticks per second. 0 is treated as 1.
    pub fn new(tick_hz: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(tick_hz.max(1))),
            previous_time: Instant::now(),
            elapsed: 0.0,
            tick_count: 0,
        }
    }

    /// Run one tick: `tick_fn(dt, elapsed)` is called exactly once.
    pub fn tick<R>(&mut self, tick_fn: impl FnOnce(f64, f64) -> R) -> R {
        let current_time = Instant::now();
        let frame_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f64();
        self.previous_time = current_time;

        let dt = self.advance(frame_time);
        tick_fn(dt, self.elapsed)
    }

    /// Sleep for whatever is left of the current tick period.
    pub fn sleep_remaining(&self) {
        let spent = self.previous_time.elapsed();
        if let Some(remaining) = self.period.checked_sub(spent) {
            std::thread::sleep(remaining);
        }
    }

    fn advance(&mut self, frame_time: f64) -> f64 {
        let max_frame_time = self.max_frame_time();
        let dt = if frame_time > max_frame_time {
            warn!(
                "Tick took {:.1}ms, clamping to {:.1}ms",
                frame_time * 1000.0,
                max_frame_time * 1000.0
            );
            max_frame_time
        } else {
            frame_time
        };

        self.elapsed += dt;
        self.tick_count += 1;
        dt
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Largest delta a single tick may report.
    pub fn max_frame_time(&self) -> f64 {
        MAX_FRAME_TIME.max(2.0 * self.period.as_secs_f64())
    }

    /// Consumer clock in seconds: the sum of every delta handed out.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_HZ)
    }
}
