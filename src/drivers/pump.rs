//! Dosing pump relay driver.
//!
//! On/off control of the pump through a relay coil on any
//! `embedded-hal` output pin.  Relay modules are commonly active-LOW,
//! so the driver maps the logical engaged/disengaged state onto the
//! correct line level.
//!
//! ## Safety contract
//!
//! The pump must be disengaged on every exit path.  The controller's
//! teardown calls [`PumpActuator::disengage`]; as a last line, dropping
//! an engaged actuator also drives the relay off.
//!
//! Both operations are idempotent and re-drive the line every call, so a
//! disengage after an earlier failed write still reaches the pin.

use embedded_hal::digital::{Error as _, OutputPin};
use log::{debug, error};

use crate::error::{HardwareFault, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Engaged,
    Disengaged,
}

pub struct PumpActuator<P: OutputPin> {
    pin: P,
    active_low: bool,
    state: PumpState,
}

impl<P: OutputPin> PumpActuator<P> {
    /// Take ownership of the relay pin and drive it to the off level.
    pub fn new(pin: P, active_low: bool) -> Result<Self> {
        let mut pump = Self {
            pin,
            active_low,
            state: PumpState::Disengaged,
        };
        pump.drive(false)?;
        Ok(pump)
    }

    pub fn engage(&mut self) -> Result<()> {
        self.drive(true)?;
        if self.state != PumpState::Engaged {
            debug!("pump: engaged");
        }
        self.state = PumpState::Engaged;
        Ok(())
    }

    pub fn disengage(&mut self) -> Result<()> {
        self.drive(false)?;
        if self.state != PumpState::Disengaged {
            debug!("pump: disengaged");
        }
        self.state = PumpState::Disengaged;
        Ok(())
    }

    /// Last successfully commanded state.
    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_engaged(&self) -> bool {
        self.state == PumpState::Engaged
    }

    fn drive(&mut self, energize: bool) -> Result<()> {
        let high = energize != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|e| HardwareFault::RelayWrite(e.kind()).into())
    }
}

impl<P: OutputPin> Drop for PumpActuator<P> {
    fn drop(&mut self) {
        if self.state == PumpState::Engaged {
            if let Err(e) = self.disengage() {
                error!("pump: disengage on drop failed: {e}");
            }
        }
    }
}
