//! Running total of dispensed volume.
//!
//! Owned by the control loop alone; no locking.  The total only ever
//! grows for the lifetime of the process and is not persisted.

use crate::error::{Result, Violation};

#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeAccumulator {
    total_volume: f64,
}

impl VolumeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one window's volume into the total.
    ///
    /// Negative or NaN input is rejected and leaves the total unchanged.
    pub fn add(&mut self, incremental_volume: f64) -> Result<()> {
        if incremental_volume.is_nan() || incremental_volume < 0.0 {
            return Err(Violation::NegativeVolume(incremental_volume).into());
        }
        self.total_volume += incremental_volume;
        Ok(())
    }

    pub fn snapshot(&self) -> f64 {
        self.total_volume
    }
}
