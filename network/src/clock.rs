//! Time source for timers.

use std::time::Instant;

/// Monotonic millisecond clock shared by every timer on one event loop.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock implementation measuring from its own construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
