//! Clock sources for pose interpolation.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use atomic_float::AtomicF64;

/// Monotonically increasing time in seconds.
pub trait Clock: Send + Sync {
    fn current_time(&self) -> f64;
}

/// Wall-clock stand-in used when no platform audio backend exists, so poses
/// keep moving even though nothing is audible.
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally driven clock. Clones share the same time.
///
/// `set` ignores attempts to move backwards so the clock stays monotonic.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<AtomicF64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Arc::new(AtomicF64::new(start)),
        }
    }

    pub fn set(&self, time: f64) {
        self.time.fetch_max(time, Ordering::AcqRel);
    }

    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.time.fetch_add(dt, Ordering::AcqRel);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time.load(Ordering::Acquire)
    }
}
