//! Flow-rate and volume derivation from a window's pulse count.
//!
//! Pure arithmetic, no I/O:
//!
//! ```text
//! incremental_volume   = pulses / pulses_per_unit_volume
//! flow_rate_per_minute = incremental_volume / elapsed_secs × 60
//! ```

use crate::error::{Error, Result, Violation};

/// Result of one sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSample {
    /// Pulses counted in the window.
    pub pulse_count: u32,
    /// Measured window length (seconds).
    pub elapsed_secs: f64,
    /// Volume units per minute over the window.
    pub flow_rate_per_minute: f64,
    /// Volume moved during the window.
    pub incremental_volume: f64,
}

impl FlowSample {
    /// Derive flow rate and volume for one window.
    ///
    /// Fails with [`Error::InvalidWindow`] when `elapsed_secs` is not a
    /// positive finite number: a sleep cut short right at the start would
    /// otherwise produce an absurd flow rate.
    pub fn compute(pulse_count: u32, elapsed_secs: f64, pulses_per_unit_volume: f64) -> Result<Self> {
        if !pulses_per_unit_volume.is_finite() || pulses_per_unit_volume <= 0.0 {
            return Err(Violation::NonPositiveCalibration(pulses_per_unit_volume).into());
        }
        if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return Err(Error::InvalidWindow { elapsed_secs });
        }

        let incremental_volume = f64::from(pulse_count) / pulses_per_unit_volume;
        let flow_rate_per_minute = incremental_volume / elapsed_secs * 60.0;

        Ok(Self {
            pulse_count,
            elapsed_secs,
            flow_rate_per_minute,
            incremental_volume,
        })
    }
}
