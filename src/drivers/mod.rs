//! Actuator drivers.

pub mod pump;

pub use pump::{PumpActuator, PumpState};
