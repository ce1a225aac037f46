//! Port traits: the boundary between the controller and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DutyCycleController
//! ```
//!
//! The relay output needs no port of its own: it is any
//! [`embedded_hal::digital::OutputPin`], wrapped by
//! [`PumpActuator`](crate::drivers::PumpActuator).

use core::time::Duration;
use std::sync::Arc;

use crate::error::Result;
use crate::sensors::PulseCounter;
use crate::shutdown::ShutdownSignal;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Flow sensor port (edge source → domain)
// ───────────────────────────────────────────────────────────────

/// Edge-triggered pulse input.
///
/// Pull mode and trigger edge are fixed when the adapter is built.
pub trait FlowSensorPort {
    /// Bind every sensor edge to `counter.increment()`.  The binding runs
    /// in the adapter's asynchronous context (ISR or generator thread)
    /// and must only ever call `increment`.
    fn on_edge(&mut self, counter: Arc<PulseCounter>) -> Result<()>;

    /// Remove the edge binding and release the input.  Idempotent, and
    /// safe to call without a prior `on_edge`.
    fn close(&mut self) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and interruptible waiting.
pub trait Clock {
    /// Time since an arbitrary fixed origin; never goes backwards.
    fn uptime(&self) -> Duration;

    /// Block for `duration`, returning `Err(Error::Interrupted)` as soon
    /// as `shutdown` is requested (immediately if it already was).
    fn sleep(&mut self, duration: Duration, shutdown: &ShutdownSignal) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / persistence)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go (serial log, append-only file, …).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

/// Forwards every event to two sinks, in order.
pub struct FanoutSink<A, B> {
    pub first: A,
    pub second: B,
}

impl<A: EventSink, B: EventSink> FanoutSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: EventSink, B: EventSink> EventSink for FanoutSink<A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.first.emit(event);
        self.second.emit(event);
    }
}
