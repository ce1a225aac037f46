//! Integration tests: shutdown and fault paths.  Whatever stops the loop,
//! the relay must end de-energized and the sensor released exactly once.

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use embedded_hal::digital::ErrorKind;
use flowdose::adapters::time::SystemClock;
use flowdose::app::controller::DutyCycleController;
use flowdose::app::events::{AppEvent, StopReason};
use flowdose::config::CycleConfig;
use flowdose::drivers::PumpActuator;
use flowdose::error::{Error, HardwareFault};
use flowdose::fsm::Phase;
use flowdose::shutdown::ShutdownSignal;

use crate::mock_hw::{
    MockRelayPin, MockSensor, RecordingSink, SleepPlan, reference_config, rig, steady,
};

fn cycle_count(sink: &RecordingSink) -> usize {
    sink.events
        .iter()
        .filter(|e| matches!(e, AppEvent::Cycle(_)))
        .count()
}

#[test]
fn interrupt_mid_window_discards_partial_cycle() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, move |s| {
        if s.requested == cfg.window_duration {
            SleepPlan {
                pulses: 20,
                interrupt: true,
                ..SleepPlan::default()
            }
        } else {
            SleepPlan::pass()
        }
    });
    let mut sink = RecordingSink::default();
    let report = ctl.run(&mut sink);

    assert_eq!(report.stop, StopReason::Interrupted);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.cycles_completed, 0);
    assert_eq!(report.total_volume, 0.0);
    assert_eq!(cycle_count(&sink), 0);

    assert!(rig.relay.ever_energized());
    assert!(!rig.relay.energized());
    assert_eq!(rig.sensor.closes.get(), 1);
    assert!(rig.shutdown.is_requested());
}

#[test]
fn interrupt_during_idle_keeps_completed_cycles() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, move |s| {
        if s.requested == cfg.window_duration {
            SleepPlan::pulses(45)
        } else if s.requested == cfg.idle_interval && s.index >= 5 {
            SleepPlan::interrupt()
        } else {
            SleepPlan::pass()
        }
    });
    let mut sink = RecordingSink::default();
    let report = ctl.run(&mut sink);

    // Second idle wait (sleep #5) is cut short: two cycles counted.
    assert_eq!(report.stop, StopReason::Interrupted);
    assert_eq!(report.cycles_completed, 2);
    assert!((report.total_volume - 0.2).abs() < 1e-9);
    assert_eq!(cycle_count(&sink), 2);
    assert!(!rig.relay.energized());
    assert_eq!(rig.sleeps().len(), 6);
}

#[test]
fn shutdown_before_run_never_engages_pump() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, |_| SleepPlan::pass());
    rig.shutdown.trigger();

    let report = ctl.run(&mut RecordingSink::default());

    assert_eq!(report.stop, StopReason::Interrupted);
    assert_eq!(report.exit_code(), 0);
    assert!(!rig.relay.ever_energized());
    assert!(rig.sleeps().is_empty());
    assert_eq!(rig.sensor.closes.get(), 1);
}

#[test]
fn zero_length_window_is_a_fault() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, move |s| {
        if s.requested == cfg.window_duration {
            SleepPlan {
                pulses: 45,
                advance: Some(Duration::ZERO),
                interrupt: false,
            }
        } else {
            SleepPlan::pass()
        }
    });
    let mut sink = RecordingSink::default();
    let report = ctl.run(&mut sink);

    let expected = StopReason::Fault {
        phase: Phase::Draining,
        error: Error::InvalidWindow { elapsed_secs: 0.0 },
    };
    assert_eq!(report.stop, expected);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.cycles_completed, 0);
    assert_eq!(report.total_volume, 0.0);

    // Fault is reported before the final stop event.
    let n = sink.events.len();
    assert!(matches!(sink.events[n - 1], AppEvent::Stopped(_)));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Fault {
            phase: Phase::Draining,
            ..
        }
    )));

    assert!(!rig.relay.energized());
    assert_eq!(rig.sensor.closes.get(), 1);
    // No idle wait after the fault.
    assert_eq!(rig.sleeps().len(), 2);
}

#[test]
fn relay_failure_faults_and_still_releases_sensor() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, |_| SleepPlan::pass());
    rig.relay.broken.set(true);

    let report = ctl.run(&mut RecordingSink::default());

    assert_eq!(
        report.stop,
        StopReason::Fault {
            phase: Phase::Stabilizing,
            error: Error::HardwareFault(HardwareFault::RelayWrite(ErrorKind::Other)),
        }
    );
    assert_eq!(report.exit_code(), 1);
    assert_eq!(rig.sensor.closes.get(), 1);
    assert!(!rig.relay.ever_energized());
}

#[test]
fn sensor_subscribe_failure_stops_before_motion() {
    let cfg = reference_config();
    let (mut ctl, rig) = rig(cfg, |_| SleepPlan::pass());
    rig.sensor.fail_subscribe.set(true);

    let report = ctl.run(&mut RecordingSink::default());

    assert_eq!(
        report.stop,
        StopReason::Fault {
            phase: Phase::Idle,
            error: Error::HardwareFault(HardwareFault::SensorSubscribe),
        }
    );
    assert!(!rig.relay.ever_energized());
    assert!(rig.sleeps().is_empty());
}

#[test]
fn teardown_runs_once_across_run_and_drop() {
    let cfg = reference_config();
    let (ctl, rig) = rig(cfg, steady(cfg.window_duration, 45));
    let mut ctl = ctl.with_cycle_limit(1);

    let first = ctl.run(&mut RecordingSink::default());
    let second = ctl.run(&mut RecordingSink::default());
    assert_eq!(first, second);
    drop(ctl);

    assert_eq!(rig.sensor.subscribes.get(), 1);
    assert_eq!(rig.sensor.closes.get(), 1);
    assert!(!rig.relay.energized());
}

#[test]
fn invalid_config_refuses_to_start() {
    let relay = MockRelayPin::default();
    let pump = PumpActuator::new(relay.clone(), true).unwrap();
    let cfg = CycleConfig {
        pulses_per_unit_volume: 0.0,
        ..reference_config()
    };

    let res = DutyCycleController::new(
        cfg,
        pump,
        MockSensor::default(),
        SystemClock::new(),
        Arc::new(ShutdownSignal::new()),
    );

    assert!(matches!(res, Err(Error::Config(_))));
    assert!(!relay.ever_energized());
}

#[test]
fn signal_from_another_thread_cuts_real_sleep_short() {
    let cfg = CycleConfig {
        stabilization_delay: Duration::from_millis(10),
        window_duration: Duration::from_secs(30),
        ..reference_config()
    };
    let relay = MockRelayPin::default();
    let sensor = MockSensor::default();
    let shutdown = Arc::new(ShutdownSignal::new());
    let pump = PumpActuator::new(relay.clone(), true).unwrap();
    let mut ctl = DutyCycleController::new(
        cfg,
        pump,
        sensor.clone(),
        SystemClock::new(),
        Arc::clone(&shutdown),
    )
    .unwrap();

    let remote = Arc::clone(&shutdown);
    let trigger = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        remote.trigger();
    });

    let started = Instant::now();
    let report = ctl.run(&mut RecordingSink::default());
    let took = started.elapsed();
    trigger.join().unwrap();

    assert_eq!(report.stop, StopReason::Interrupted);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.cycles_completed, 0);
    assert!(took < Duration::from_secs(3), "run took {took:?}");
    assert!(relay.ever_energized());
    assert!(!relay.energized());
    assert_eq!(sensor.closes.get(), 1);
}
