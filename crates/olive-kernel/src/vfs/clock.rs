//! Time sources for node timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use olive_types::Millis;

/// Supplies the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> Millis;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that advances by a fixed step on every read.
///
/// Two writes in the same millisecond are indistinguishable on the wall
/// clock; tests that check `modified` advancing use this instead.
#[derive(Debug)]
pub struct StepClock {
    next: AtomicI64,
    step: Millis,
}

impl StepClock {
    pub fn new(start: Millis, step: Millis) -> Self {
        Self {
            next: AtomicI64::new(start),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now_millis(&self) -> Millis {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}
