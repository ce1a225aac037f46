//! Duty-cycle controller: the core control loop.
//!
//! [`DutyCycleController`] owns the pump actuator, the flow sensor
//! subscription, the clock and the volume total, and walks the phase
//! cycle from [`crate::fsm`] until a shutdown request or a fault.
//!
//! ```text
//!  FlowSensorPort ──edges──▶ PulseCounter ──take──┐
//!                                                 ▼
//!  Clock ◀──sleep/uptime── ┌───────────────────────────┐ ──▶ EventSink
//!                          │   DutyCycleController     │
//!  PumpActuator ◀──────────│ phases · sample · volume  │
//!                          └───────────────────────────┘
//! ```
//!
//! ## Teardown contract
//!
//! Whatever ends the loop (shutdown signal, fault, cycle limit), the
//! pump is disengaged and the sensor released exactly once before
//! [`run`](DutyCycleController::run) returns.  If the controller is
//! dropped without completing `run` (e.g. unwinding from a panic in an
//! adapter), `Drop` performs the same teardown.
//!
//! There is no retry: one failed cycle stops the loop, because the pump
//! must not keep running on timing state that is no longer trusted.

use core::time::Duration;
use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use heapless::HistoryBuffer;
use log::{debug, error, info, warn};

use crate::config::CycleConfig;
use crate::control::VolumeAccumulator;
use crate::drivers::PumpActuator;
use crate::error::{Error, Result};
use crate::fsm::Phase;
use crate::sensors::{FlowSample, PulseCounter};
use crate::shutdown::ShutdownSignal;

use super::events::{AppEvent, CycleRecord, RunReport, StopReason};
use super::ports::{Clock, EventSink, FlowSensorPort};

/// Number of recent cycle records kept for diagnostics.
pub const HISTORY_LEN: usize = 16;

pub struct DutyCycleController<P: OutputPin, S: FlowSensorPort, C: Clock> {
    config: CycleConfig,
    pump: PumpActuator<P>,
    sensor: S,
    clock: C,
    shutdown: Arc<ShutdownSignal>,
    counter: Arc<PulseCounter>,
    volume: VolumeAccumulator,
    phase: Phase,
    /// Measured (start, end) of the window awaiting evaluation.
    window: Option<(Duration, Duration)>,
    cycles_completed: u64,
    cycle_limit: Option<u64>,
    history: HistoryBuffer<CycleRecord, HISTORY_LEN>,
    stop: Option<StopReason>,
    torn_down: bool,
}

impl<P: OutputPin, S: FlowSensorPort, C: Clock> DutyCycleController<P, S, C> {
    /// Build the controller.  Fails on an invalid configuration before
    /// anything touches the hardware.
    pub fn new(
        config: CycleConfig,
        pump: PumpActuator<P>,
        sensor: S,
        clock: C,
        shutdown: Arc<ShutdownSignal>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pump,
            sensor,
            clock,
            shutdown,
            counter: Arc::new(PulseCounter::new()),
            volume: VolumeAccumulator::new(),
            phase: Phase::Idle,
            window: None,
            cycles_completed: 0,
            cycle_limit: None,
            history: HistoryBuffer::new(),
            stop: None,
            torn_down: false,
        })
    }

    /// Stop cleanly after `cycles` complete duty cycles.
    pub fn with_cycle_limit(mut self, cycles: u64) -> Self {
        self.cycle_limit = Some(cycles);
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run duty cycles until shutdown, fault, or the cycle limit.
    ///
    /// Teardown has always completed when this returns.  Calling `run`
    /// again afterwards returns the same report without side effects.
    pub fn run(&mut self, sink: &mut impl EventSink) -> RunReport {
        if let Some(stop) = self.stop {
            return self.report(stop);
        }

        sink.emit(&AppEvent::Started(self.config));

        let mut stop = match self.drive(sink) {
            Ok(()) => StopReason::Completed,
            Err(error) if error.is_interrupt() => {
                info!("controller: interrupted during {}", self.phase);
                StopReason::Interrupted
            }
            Err(error) => {
                debug!(
                    "controller: cycle {} aborted in {}",
                    self.cycles_completed + 1,
                    self.phase
                );
                sink.emit(&AppEvent::Fault {
                    phase: self.phase,
                    error,
                });
                StopReason::Fault {
                    phase: self.phase,
                    error,
                }
            }
        };

        if let Err(error) = self.teardown() {
            // A clean stop that could not switch the pump off is a fault.
            if !matches!(stop, StopReason::Fault { .. }) {
                sink.emit(&AppEvent::Fault {
                    phase: Phase::Shutdown,
                    error,
                });
                stop = StopReason::Fault {
                    phase: Phase::Shutdown,
                    error,
                };
            }
        }
        self.set_phase(Phase::Shutdown, sink);

        self.stop = Some(stop);
        let report = self.report(stop);
        sink.emit(&AppEvent::Stopped(report));
        report
    }

    /// Subscribe the sensor, then step through phases until something
    /// ends the loop.
    fn drive(&mut self, sink: &mut impl EventSink) -> Result<()> {
        self.sensor.on_edge(Arc::clone(&self.counter))?;

        loop {
            if self.shutdown.is_requested() {
                return Err(Error::Interrupted);
            }
            if self.phase == Phase::Idle
                && self
                    .cycle_limit
                    .is_some_and(|limit| self.cycles_completed >= limit)
            {
                info!("controller: cycle limit reached");
                return Ok(());
            }
            self.advance(sink)?;
        }
    }

    /// Enter the next phase and perform its work.
    fn advance(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let next = self.phase.next();
        self.set_phase(next, sink);

        match next {
            Phase::Stabilizing => {
                self.pump.engage()?;
                self.sleep(self.config.stabilization_delay)?;
            }
            Phase::Sampling => self.sample_window()?,
            Phase::Draining => {
                // Pump off before anything else.
                self.pump.disengage()?;
                self.evaluate_window(sink)?;
                self.sleep(self.config.idle_interval)?;
            }
            Phase::Idle | Phase::Shutdown => {}
        }
        debug_assert_eq!(self.pump.is_engaged(), next.pump_engaged());
        Ok(())
    }

    /// Open the window at a zeroed counter, wait, and record the
    /// measured boundaries.
    fn sample_window(&mut self) -> Result<()> {
        let settling = self.counter.reset_and_take();
        if settling > 0 {
            debug!("controller: discarded {settling} pulses from stabilization");
        }
        let start = self.clock.uptime();
        self.sleep(self.config.window_duration)?;
        let end = self.clock.uptime();
        self.window = Some((start, end));
        Ok(())
    }

    /// Drain the counter, derive the sample and fold it into the total.
    fn evaluate_window(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let pulses = self.counter.reset_and_take();
        let (start, end) = self.window.take().unwrap_or_default();
        let elapsed = end.saturating_sub(start).as_secs_f64();

        let sample = FlowSample::compute(pulses, elapsed, self.config.pulses_per_unit_volume)?;
        self.volume.add(sample.incremental_volume)?;
        self.cycles_completed += 1;

        let record = CycleRecord {
            cycle: self.cycles_completed,
            uptime_ms: self.clock.uptime().as_millis() as u64,
            elapsed_seconds: sample.elapsed_secs,
            pulse_count: sample.pulse_count,
            incremental_volume: sample.incremental_volume,
            flow_rate_per_minute: sample.flow_rate_per_minute,
            total_volume: self.volume.snapshot(),
        };
        self.history.write(record);
        sink.emit(&AppEvent::Cycle(record));
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) -> Result<()> {
        self.clock.sleep(duration, &self.shutdown)
    }

    fn set_phase(&mut self, next: Phase, sink: &mut impl EventSink) {
        // Nothing leaves Shutdown.
        if next == self.phase || self.phase.is_terminal() {
            return;
        }
        let from = self.phase;
        self.phase = next;
        sink.emit(&AppEvent::PhaseChanged { from, to: next });
    }

    /// Disengage the pump, then release the sensor.  Runs once; both
    /// steps are attempted even if the first fails.
    fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let pump = self.pump.disengage();
        if let Err(e) = &pump {
            error!("teardown: pump disengage failed: {e}");
        }
        let sensor = self.sensor.close();
        if let Err(e) = &sensor {
            error!("teardown: sensor release failed: {e}");
        }
        if pump.is_ok() && sensor.is_ok() {
            info!("teardown: pump off, sensor released");
        }
        pump.and(sensor)
    }

    fn report(&self, stop: StopReason) -> RunReport {
        RunReport {
            cycles_completed: self.cycles_completed,
            total_volume: self.volume.snapshot(),
            stop,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn total_volume(&self) -> f64 {
        self.volume.snapshot()
    }

    /// Up to [`HISTORY_LEN`] most recent cycles, oldest first.
    pub fn recent_cycles(&self) -> impl Iterator<Item = &CycleRecord> {
        self.history.oldest_ordered()
    }
}

impl<P: OutputPin, S: FlowSensorPort, C: Clock> Drop for DutyCycleController<P, S, C> {
    fn drop(&mut self) {
        if !self.torn_down {
            warn!("controller dropped without teardown; forcing pump off");
            let _ = self.teardown();
        }
    }
}
