//! Mock hardware for integration tests.
//!
//! A relay pin that records every level written, a flow sensor whose
//! edges are fired by hand, and a virtual clock that never really
//! sleeps.  Each virtual sleep is logged together with the relay state
//! at that moment, and a per-test plan decides what happens during it
//! (pulses, elapsed time, shutdown).

#![allow(dead_code)]

use core::convert::Infallible;
use core::time::Duration;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use flowdose::app::controller::DutyCycleController;
use flowdose::app::events::AppEvent;
use flowdose::app::ports::{Clock, EventSink, FlowSensorPort};
use flowdose::config::CycleConfig;
use flowdose::drivers::PumpActuator;
use flowdose::error::{Error, HardwareFault, Result};
use flowdose::sensors::PulseCounter;
use flowdose::shutdown::ShutdownSignal;

// ── Relay pin ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct PinFailure;

impl embedded_hal::digital::Error for PinFailure {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Active-low relay pin.  Clones share state.
#[derive(Clone, Default)]
pub struct MockRelayPin {
    /// Levels written, `true` = HIGH.
    pub levels: Rc<RefCell<Vec<bool>>>,
    /// When set, every write fails.
    pub broken: Rc<Cell<bool>>,
}

impl MockRelayPin {
    /// Coil energized (line LOW) after the last successful write.
    pub fn energized(&self) -> bool {
        self.levels.borrow().last() == Some(&false)
    }

    pub fn ever_energized(&self) -> bool {
        self.levels.borrow().iter().any(|high| !high)
    }

    fn write(&self, high: bool) -> core::result::Result<(), PinFailure> {
        if self.broken.get() {
            return Err(PinFailure);
        }
        self.levels.borrow_mut().push(high);
        Ok(())
    }
}

impl ErrorType for MockRelayPin {
    type Error = PinFailure;
}

impl OutputPin for MockRelayPin {
    fn set_low(&mut self) -> core::result::Result<(), PinFailure> {
        self.write(false)
    }
    fn set_high(&mut self) -> core::result::Result<(), PinFailure> {
        self.write(true)
    }
}

// ── Flow sensor ───────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockSensor {
    pub bound: Rc<RefCell<Option<Arc<PulseCounter>>>>,
    pub subscribes: Rc<Cell<u32>>,
    pub closes: Rc<Cell<u32>>,
    pub fail_subscribe: Rc<Cell<bool>>,
}

impl MockSensor {
    /// Deliver `n` edges, as the ISR would.  Edges with no binding are lost.
    pub fn fire(&self, n: u32) {
        if let Some(counter) = self.bound.borrow().as_ref() {
            for _ in 0..n {
                counter.increment();
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.borrow().is_some()
    }
}

impl FlowSensorPort for MockSensor {
    fn on_edge(&mut self, counter: Arc<PulseCounter>) -> Result<()> {
        if self.fail_subscribe.get() {
            return Err(HardwareFault::SensorSubscribe.into());
        }
        self.subscribes.set(self.subscribes.get() + 1);
        *self.bound.borrow_mut() = Some(counter);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes.set(self.closes.get() + 1);
        *self.bound.borrow_mut() = None;
        Ok(())
    }
}

// ── Virtual clock ─────────────────────────────────────────────

/// One call to `Clock::sleep`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepRecord {
    pub index: usize,
    pub requested: Duration,
    pub relay_energized: bool,
}

/// What happens while the controller is asleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepPlan {
    /// Edges fired during the sleep.
    pub pulses: u32,
    /// Virtual time that passes; `None` = the requested duration.
    pub advance: Option<Duration>,
    /// Raise shutdown part-way through.
    pub interrupt: bool,
}

impl SleepPlan {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn pulses(n: u32) -> Self {
        Self {
            pulses: n,
            ..Self::default()
        }
    }

    pub fn interrupt() -> Self {
        Self {
            interrupt: true,
            ..Self::default()
        }
    }
}

type Plan = Box<dyn FnMut(&SleepRecord) -> SleepPlan>;

pub struct VirtualClock {
    now: Duration,
    relay: MockRelayPin,
    sensor: MockSensor,
    sleeps: Rc<RefCell<Vec<SleepRecord>>>,
    plan: Plan,
}

impl Clock for VirtualClock {
    fn uptime(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration, shutdown: &ShutdownSignal) -> Result<()> {
        if shutdown.is_requested() {
            return Err(Error::Interrupted);
        }
        let record = SleepRecord {
            index: self.sleeps.borrow().len(),
            requested: duration,
            relay_energized: self.relay.energized(),
        };
        self.sleeps.borrow_mut().push(record);

        let plan = (self.plan)(&record);
        self.sensor.fire(plan.pulses);
        if plan.interrupt {
            self.now += plan.advance.unwrap_or(duration / 2);
            shutdown.trigger();
            return Err(Error::Interrupted);
        }
        self.now += plan.advance.unwrap_or(duration);
        Ok(())
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestController = DutyCycleController<MockRelayPin, MockSensor, VirtualClock>;

/// Handles onto the mocks owned by the controller.
pub struct Rig {
    pub relay: MockRelayPin,
    pub sensor: MockSensor,
    pub sleeps: Rc<RefCell<Vec<SleepRecord>>>,
    pub shutdown: Arc<ShutdownSignal>,
}

impl Rig {
    pub fn sleeps(&self) -> Vec<SleepRecord> {
        self.sleeps.borrow().clone()
    }
}

/// 3 s window, 2 s idle, 1 s stabilization, 450 pulses per litre.
pub fn reference_config() -> CycleConfig {
    CycleConfig {
        window_duration: Duration::from_secs(3),
        idle_interval: Duration::from_secs(2),
        stabilization_delay: Duration::from_secs(1),
        pulses_per_unit_volume: 450.0,
    }
}

pub fn rig(
    config: CycleConfig,
    plan: impl FnMut(&SleepRecord) -> SleepPlan + 'static,
) -> (TestController, Rig) {
    let relay = MockRelayPin::default();
    let sensor = MockSensor::default();
    let sleeps = Rc::new(RefCell::new(Vec::new()));
    let shutdown = Arc::new(ShutdownSignal::new());

    let clock = VirtualClock {
        now: Duration::from_secs(100),
        relay: relay.clone(),
        sensor: sensor.clone(),
        sleeps: Rc::clone(&sleeps),
        plan: Box::new(plan),
    };
    let pump = PumpActuator::new(relay.clone(), true).expect("mock relay");
    let controller =
        DutyCycleController::new(config, pump, sensor.clone(), clock, Arc::clone(&shutdown))
            .expect("valid config");

    (
        controller,
        Rig {
            relay,
            sensor,
            sleeps,
            shutdown,
        },
    )
}

/// Plan that fires `pulses` during every sampling window.
pub fn steady(window: Duration, pulses: u32) -> impl FnMut(&SleepRecord) -> SleepPlan {
    move |s| {
        if s.requested == window {
            SleepPlan::pulses(pulses)
        } else {
            SleepPlan::pass()
        }
    }
}
