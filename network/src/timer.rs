//! Single-callback timer polled by the event loop.
//!
//! A [`Timer`] carries an opaque payload that identifies what should happen
//! when it fires. The owner polls it on every loop iteration; a due poll
//! returns the payload and the owner runs the corresponding handler
//! synchronously, so firings of one timer never overlap.

use std::fmt;
use std::rc::Rc;

use crate::Clock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Schedule {
    deadline_ms: u64,
    /// `0` for a one-shot timer.
    repeat_ms: u64,
}

pub struct Timer<P> {
    clock: Rc<dyn Clock>,
    payload: P,
    schedule: Option<Schedule>,
}

impl<P> Timer<P> {
    /// Create a stopped timer bound to `clock`.
    pub fn new(clock: Rc<dyn Clock>, payload: P) -> Self {
        Self {
            clock,
            payload,
            schedule: None,
        }
    }

    /// Schedule the first firing `timeout_ms` from now, then every
    /// `repeat_ms` (`0` makes it one-shot). Replaces any pending schedule.
    pub fn start(&mut self, timeout_ms: u64, repeat_ms: u64) {
        self.schedule = Some(Schedule {
            deadline_ms: self.clock.now_ms().saturating_add(timeout_ms),
            repeat_ms,
        });
    }

    /// Cancel all future firings.
    pub fn stop(&mut self) {
        self.schedule = None;
    }

    pub fn is_active(&self) -> bool {
        self.schedule.is_some()
    }

    /// Absolute time of the next firing, if scheduled.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.schedule.map(|s| s.deadline_ms)
    }

    /// Milliseconds until the next firing (`0` if already due).
    pub fn remaining_ms(&self) -> Option<u64> {
        self.deadline_ms()
            .map(|d| d.saturating_sub(self.clock.now_ms()))
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Report at most one firing. A repeating timer is rescheduled relative
    /// to the current time, so a late poll does not produce a burst.
    pub fn poll(&mut self) -> Option<&P> {
        let now = self.clock.now_ms();
        let schedule = self.schedule.as_mut()?;
        if now < schedule.deadline_ms {
            return None;
        }
        if schedule.repeat_ms == 0 {
            self.schedule = None;
        } else {
            schedule.deadline_ms = now.saturating_add(schedule.repeat_ms);
        }
        Some(&self.payload)
    }
}

impl<P> Drop for Timer<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<P: fmt::Debug> fmt::Debug for Timer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("payload", &self.payload)
            .field("schedule", &self.schedule)
            .finish()
    }
}
