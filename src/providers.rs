//! Injectable time and randomness.
//!
//! Components that would otherwise call `Local::now()`, `thread::sleep` or
//! `thread_rng()` take a [`TimeProvider`] / [`RandomProvider`] instead. The
//! system implementations are used by the factories; [`FixedClock`] and
//! [`SequenceRandom`] make the same components reproducible under test.

use chrono::{Local, NaiveDateTime, TimeDelta};
use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;

/// Source of wall-clock time and blocking delays.
pub trait TimeProvider: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Block for the given duration.
    fn sleep(&self, duration: Duration);
}

/// Source of uniformly distributed floats.
pub trait RandomProvider: Send + Sync {
    /// Float in `[min, max)`.
    fn uniform(&self, min: f64, max: f64) -> f64;

    /// Float in `[0, 1)`.
    fn random(&self) -> f64;
}

// ============================================================================
// System implementations
// ============================================================================

/// Local clock backed by `chrono::Local` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomProvider for ThreadRandom {
    fn uniform(&self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..max)
    }

    fn random(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

// ============================================================================
// Deterministic implementations
// ============================================================================

/// Clock frozen at a settable instant. `sleep` returns immediately and
/// records the requested duration.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Durations passed to `sleep`, oldest first.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl TimeProvider for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Replays a fixed list of values, wrapping around at the end. `uniform`
/// ignores its bounds; both methods advance the same cursor.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: Mutex<usize>,
}

impl SequenceRandom {
    /// An empty list replays `0.0` forever.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            cursor: Mutex::new(0),
        }
    }

    fn next_value(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut cursor = self.cursor.lock();
        let value = self.values[*cursor];
        *cursor = (*cursor + 1) % self.values.len();
        value
    }
}

impl RandomProvider for SequenceRandom {
    fn uniform(&self, _min: f64, _max: f64) -> f64 {
        self.next_value()
    }

    fn random(&self) -> f64 {
        self.next_value()
    }
}
