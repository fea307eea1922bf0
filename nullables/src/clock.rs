//! Nullable clock — deterministic time for testing.

use beacon_network::Clock;
use std::cell::Cell;

/// A deterministic millisecond clock for testing.
///
/// Time only advances when you tell it to.
#[derive(Debug, Default)]
pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_ms: u64) -> Self {
        Self {
            current: Cell::new(initial_ms),
        }
    }

    /// Advance time by a number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.current.set(self.current.get() + ms);
    }

    /// Set the time to a specific value.
    pub fn set(&self, ms: u64) {
        self.current.set(ms);
    }
}

impl Clock for NullClock {
    fn now_ms(&self) -> u64 {
        self.current.get()
    }
}
