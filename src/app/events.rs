//! Outbound controller events.
//!
//! The [`DutyCycleController`](super::controller::DutyCycleController)
//! emits these through the [`EventSink`](super::ports::EventSink) port.

use serde::Serialize;

use crate::config::CycleConfig;
use crate::error::Error;
use crate::fsm::Phase;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller is about to run its first cycle.
    Started(CycleConfig),

    /// The controller moved between phases.
    PhaseChanged { from: Phase, to: Phase },

    /// A sampling window was evaluated.
    Cycle(CycleRecord),

    /// A fault aborted the loop; teardown follows.
    Fault { phase: Phase, error: Error },

    /// Teardown finished.
    Stopped(RunReport),
}

/// One completed duty cycle, as written to the durable cycle log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleRecord {
    /// 1-based cycle number since startup.
    pub cycle: u64,
    /// Monotonic time at which the record was produced.
    pub uptime_ms: u64,
    /// Measured window length.
    pub elapsed_seconds: f64,
    /// Raw pulses counted in the window.
    pub pulse_count: u32,
    pub incremental_volume: f64,
    pub flow_rate_per_minute: f64,
    /// Accumulated volume including this cycle.
    pub total_volume: f64,
}

/// Why the controller stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    /// External shutdown request.
    Interrupted,
    /// The configured cycle limit was reached.
    Completed,
    /// Unrecovered fault.
    Fault { phase: Phase, error: Error },
}

/// Summary returned by [`DutyCycleController::run`](super::controller::DutyCycleController::run).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub cycles_completed: u64,
    pub total_volume: f64,
    pub stop: StopReason,
}

impl RunReport {
    /// Process exit status: 0 after a clean stop, 1 after a fault.
    pub fn exit_code(&self) -> u8 {
        match self.stop {
            StopReason::Interrupted | StopReason::Completed => 0,
            StopReason::Fault { .. } => 1,
        }
    }
}
