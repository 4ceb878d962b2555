//! Periodic liveness ping sent to the connected tracker.
//!
//! The schedule runs on the consumer's clock, not on wall time inside the
//! network thread: the caller passes its own notion of "now" in seconds.

use glam::Vec3;

use crate::messages::{EventKind, Message};

/// Default seconds between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: f64 = 2.0;

/// The heartbeat payload: sentinel kind, id 0, zeroed coordinates.
pub fn heartbeat_message() -> Message {
    Message::pose(EventKind::Heartbeat, 0, Vec3::ZERO)
}

/// Decides when the next heartbeat is due.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: f64,
    next_due: f64,
}

impl Heartbeat {
    /// Schedule with the given interval in seconds. The first poll is due.
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval: interval_secs.max(0.0),
            next_due: f64::NEG_INFINITY,
        }
    }

    /// Returns `true` if a heartbeat should be sent at `now`, and if so
    /// schedules the next one `interval` seconds later.
    pub fn poll(&mut self, now: f64) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    /// Seconds between heartbeats.
    pub fn interval(&self) -> f64 {
        self.interval
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL)
    }
}
