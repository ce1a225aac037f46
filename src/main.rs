//! FlowDose: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  Relay pin        Flow sensor       SystemClock   Log sinks  │
//! │  (OutputPin)      (FlowSensorPort)  (Clock)       (EventSink)│
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          DutyCycleController (pure logic)              │  │
//! │  │  Phases · FlowSample · VolumeAccumulator               │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  ShutdownSignal ◀── SIGINT/SIGTERM (host) · stop button (ESP)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exit status is 0 after an operator abort and 1 after a fault.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use flowdose::app::controller::DutyCycleController;
use flowdose::app::events::RunReport;
use flowdose::adapters::log_sink::LogEventSink;
use flowdose::adapters::time::SystemClock;
use flowdose::config::SystemConfig;
use flowdose::drivers::PumpActuator;
use flowdose::shutdown::ShutdownSignal;

fn main() -> Result<ExitCode> {
    // ── 1. Logging ────────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    let config = SystemConfig::default();

    #[cfg(not(target_os = "espidf"))]
    flowdose::adapters::file_logger::init(&config.log)?;

    info!("FlowDose v{}", env!("CARGO_PKG_VERSION"));
    match serde_json::to_string(&config) {
        Ok(json) => info!("config: {json}"),
        Err(e) => warn!("config: not serializable ({e})"),
    }

    // ── 2. Shutdown source + hardware, then run ───────────────
    let shutdown = Arc::new(ShutdownSignal::new());
    let report = run(&config, &shutdown)?;

    Ok(ExitCode::from(report.exit_code()))
}

#[cfg(not(target_os = "espidf"))]
fn run(config: &SystemConfig, shutdown: &Arc<ShutdownSignal>) -> Result<RunReport> {
    use anyhow::Context;
    use flowdose::adapters::hardware::{SimFlowSensor, SimRelayPin};
    use flowdose::adapters::log_sink::JsonlCycleLog;
    use flowdose::app::ports::FanoutSink;

    let remote = Arc::clone(shutdown);
    ctrlc::set_handler(move || remote.trigger()).context("install signal handler")?;

    let cycle_log = JsonlCycleLog::open(&config.log.cycle_log_path)
        .with_context(|| format!("open {}", config.log.cycle_log_path))?;
    info!("cycle log: {}", cycle_log.path().display());
    let mut sink = FanoutSink::new(LogEventSink::new(), cycle_log);

    let hw = &config.hardware;
    let relay = SimRelayPin::new(hw.relay_active_low);
    let sensor = SimFlowSensor::new(hw.simulated_pulse_hz, relay.energized());
    let pump = PumpActuator::new(relay, hw.relay_active_low)?;

    let mut controller = DutyCycleController::new(
        config.cycle,
        pump,
        sensor,
        SystemClock::new(),
        Arc::clone(shutdown),
    )?;

    info!("simulation backend; press Ctrl+C to stop");
    Ok(controller.run(&mut sink))
}

#[cfg(target_os = "espidf")]
fn run(config: &SystemConfig, shutdown: &Arc<ShutdownSignal>) -> Result<RunReport> {
    use flowdose::adapters::hardware::{EspFlowSensor, StopButton, relay_pin};

    let hw = &config.hardware;
    StopButton::spawn(hw.stop_button_gpio, Arc::clone(shutdown))?;

    let pump = PumpActuator::new(relay_pin(hw.relay_gpio)?, hw.relay_active_low)?;
    let sensor = EspFlowSensor::new(hw.flow_sensor_gpio, hw.flow_sensor_pull, hw.flow_sensor_edge);

    let mut controller = DutyCycleController::new(
        config.cycle,
        pump,
        sensor,
        SystemClock::new(),
        Arc::clone(shutdown),
    )?;

    info!("relay GPIO{}, flow sensor GPIO{}, stop button GPIO{}",
        hw.relay_gpio, hw.flow_sensor_gpio, hw.stop_button_gpio);
    Ok(controller.run(&mut LogEventSink::new()))
}
