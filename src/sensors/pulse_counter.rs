//! Interrupt-fed pulse counter shared between the edge context and the
//! control loop.
//!
//! The edge source (GPIO ISR on hardware, a generator thread in
//! simulation) calls [`PulseCounter::increment`]; the control loop calls
//! [`PulseCounter::reset_and_take`] once per window.  Both are single
//! atomic read-modify-write operations on one `AtomicU32`, so the edge
//! context never waits on the control thread.
//!
//! An edge that lands in the same instant as the swap is counted in
//! exactly one of the two adjacent windows, which bounds the boundary
//! uncertainty to ±1 pulse per window.

use core::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Record one sensor edge.  Bounded, non-blocking; ISR-safe.
    ///
    /// Wraps at `u32::MAX`; the counter is drained every window so this
    /// is unreachable at any physical pulse rate.
    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically read the count and reset it to zero.
    pub fn reset_and_take(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }
}
