//! # Time Source
//!
//! The engine never reads the wall clock directly. Every component that
//! needs "now" receives an `Arc<dyn TimeSource>`; production wires
//! [`SystemClock`], tests wire [`ManualClock`] and move time explicitly.

use chrono::Utc;
use parking_lot::Mutex;

use crate::temporal::Timestamp;

/// Supplies the current instant.
pub trait TimeSource: Send + Sync {
    /// The current instant, UTC, seconds precision.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_utc(Utc::now())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: Timestamp) {
        *self.now.lock() = at;
    }

    /// Move forward by whole hours.
    pub fn advance_hours(&self, hours: i64) {
        let mut now = self.now.lock();
        *now = now.plus_hours(hours);
    }

    /// Move forward by seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock();
        *now = now.plus_secs(secs);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
