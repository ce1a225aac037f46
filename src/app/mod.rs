//! Application core: the duty-cycle controller and its boundaries.
//!
//! All interaction with hardware, time and logging goes through the
//! **port traits** in [`ports`], keeping the controller testable with
//! mock adapters and a virtual clock.

pub mod controller;
pub mod events;
pub mod ports;
