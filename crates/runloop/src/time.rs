//! Monotonic millisecond time.
//!
//! Timestamps are 32-bit millisecond counters that wrap roughly every 49.7
//! days. Ordering is therefore never done on raw values: two timestamps are
//! compared by the sign of their wrapping difference, which stays correct as
//! long as they are less than [`MAX_DELAY_MS`] apart.

use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use crate::sync::Arc;

/// Largest delay that still orders correctly against the current time.
pub const MAX_DELAY_MS: u32 = i32::MAX as u32;

/// A point on the wrapping millisecond clock.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Millis(pub u32);

impl Millis {
    pub const ZERO: Self = Self(0);

    pub const fn new(ms: u32) -> Self {
        Self(ms)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn wrapping_add(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Signed distance from `earlier` to `self`, positive when `self` is later.
    pub fn since(self, earlier: Millis) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    /// True if `self` comes strictly before `other` (handles wraparound).
    pub fn is_before(self, other: Millis) -> bool {
        self.since(other) < 0
    }

    /// True once `self` has reached `deadline`.
    pub fn has_reached(self, deadline: Millis) -> bool {
        !self.is_before(deadline)
    }

    /// Milliseconds left from `self` until `deadline`, zero if already due.
    pub fn until(self, deadline: Millis) -> u32 {
        deadline.since(self).max(0) as u32
    }
}

impl From<u32> for Millis {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of the monotonic time the run loop schedules against.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Wall-independent clock backed by [`Instant`], truncated to 32 bits.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
    offset: u32,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::starting_at(Millis::ZERO)
    }

    /// Clock whose first reading is `start`. Starting close to `u32::MAX`
    /// exercises the wraparound path on a real clock.
    pub fn starting_at(start: Millis) -> Self {
        Self {
            origin: Instant::now(),
            offset: start.raw(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        let elapsed = self.origin.elapsed().as_millis() as u32;
        Millis(elapsed.wrapping_add(self.offset))
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start.raw())),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now.raw(), Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u32) {
        // fetch_add wraps on overflow, which is exactly the counter semantics.
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        Millis(self.now.load(Ordering::SeqCst))
    }
}
