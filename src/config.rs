//! System configuration parameters.
//!
//! All tunable parameters for the dosing controller.  The structure is
//! built once in `main` and never mutated afterwards; there is no file
//! or NVS loader.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Complete startup configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub cycle: CycleConfig,
    pub hardware: HardwareConfig,
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Duty cycle
// ---------------------------------------------------------------------------

/// Timing and calibration for one engage → measure → disengage → idle period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Length of the pulse-counting window.
    #[serde(with = "millis")]
    pub window_duration: Duration,
    /// Rest period with the pump off between cycles.
    #[serde(with = "millis")]
    pub idle_interval: Duration,
    /// Wait after engaging the pump before the window opens.
    #[serde(with = "millis")]
    pub stabilization_delay: Duration,
    /// Sensor calibration: pulses emitted per unit volume (litre).
    pub pulses_per_unit_volume: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_secs(3),
            idle_interval: Duration::from_secs(2),
            stabilization_delay: Duration::from_secs(1),
            // YF-S201 datasheet: F(Hz) = 7.5 × Q(L/min) → 450 pulses per litre.
            pulses_per_unit_volume: 450.0,
        }
    }
}

impl CycleConfig {
    /// Reject values that would make the flow arithmetic meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.window_duration.is_zero() {
            return Err(Error::Config("window_duration must be non-zero"));
        }
        if !self.pulses_per_unit_volume.is_finite() || self.pulses_per_unit_volume <= 0.0 {
            return Err(Error::Config("pulses_per_unit_volume must be positive"));
        }
        Ok(())
    }

    /// Wall time of one full cycle, ignoring scheduling jitter.
    pub fn cycle_period(&self) -> Duration {
        self.stabilization_delay + self.window_duration + self.idle_interval
    }
}

// ---------------------------------------------------------------------------
// Hardware wiring
// ---------------------------------------------------------------------------

/// Input pull-resistor mode, set once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullMode {
    Up,
    Down,
    Floating,
}

/// Which edge of the sensor signal counts as one pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub relay_gpio: i32,
    /// `true` when the relay module energizes on a LOW level.
    pub relay_active_low: bool,
    pub flow_sensor_gpio: i32,
    pub flow_sensor_pull: PullMode,
    pub flow_sensor_edge: Edge,
    pub stop_button_gpio: i32,
    /// Pulse rate produced by the host simulation backend while the
    /// relay is energized.
    pub simulated_pulse_hz: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            relay_gpio: pins::RELAY_GPIO,
            relay_active_low: true,
            flow_sensor_gpio: pins::FLOW_SENSOR_GPIO,
            // With the pull-up the line idles high; a pulse pulls it low.
            flow_sensor_pull: PullMode::Up,
            flow_sensor_edge: Edge::Falling,
            stop_button_gpio: pins::STOP_BUTTON_GPIO,
            simulated_pulse_hz: 15.0, // 2 L/min at 450 pulses/L
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Human-readable append-only log.
    pub app_log_path: String,
    /// One JSON object per completed cycle, append-only.
    pub cycle_log_path: String,
    /// `log` level filter name ("error" … "trace").
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_log_path: "app.log".into(),
            cycle_log_path: "cycles.jsonl".into(),
            level: "debug".into(),
        }
    }
}

impl LogConfig {
    /// Parsed level filter; unknown names fall back to `Debug`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Debug)
    }
}

/// Serialize a [`Duration`] as whole milliseconds.
mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
