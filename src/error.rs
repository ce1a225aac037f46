//! Unified error types for the dosing controller.
//!
//! A single `Error` enum that every component converts into, keeping the
//! outermost loop boundary's handling uniform.  All variants are `Copy`
//! so they can be carried in run reports and events without allocation.

use core::fmt;

use embedded_hal::digital::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// The measured sampling window was zero, negative, or not finite.
    /// Fatal to the loop: the flow-rate arithmetic is meaningless.
    InvalidWindow { elapsed_secs: f64 },
    /// A value that can never legitimately occur was observed.
    InvariantViolation(Violation),
    /// The actuator or sensor collaborator reported an I/O failure.
    HardwareFault(HardwareFault),
    /// External shutdown request.  Not a fault; follows the same teardown.
    Interrupted,
    /// Startup configuration is invalid.
    Config(&'static str),
}

impl Error {
    /// `true` for the operator-abort path, which exits cleanly.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindow { elapsed_secs } => {
                write!(f, "invalid sampling window: {elapsed_secs}s elapsed")
            }
            Self::InvariantViolation(v) => write!(f, "invariant violation: {v}"),
            Self::HardwareFault(h) => write!(f, "hardware fault: {h}"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Invariant violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    /// An incremental volume below zero (or NaN) was offered to the accumulator.
    NegativeVolume(f64),
    /// The calibration constant was zero, negative, or not finite.
    NonPositiveCalibration(f64),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeVolume(v) => write!(f, "negative incremental volume {v}"),
            Self::NonPositiveCalibration(k) => {
                write!(f, "pulses per unit volume must be positive, got {k}")
            }
        }
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Self::InvariantViolation(v)
    }
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFault {
    /// Driving the relay output failed.
    RelayWrite(ErrorKind),
    /// The flow sensor edge subscription could not be installed.
    SensorSubscribe,
    /// Releasing the flow sensor subscription failed.
    SensorRelease,
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayWrite(kind) => write!(f, "relay write failed ({kind:?})"),
            Self::SensorSubscribe => write!(f, "flow sensor subscribe failed"),
            Self::SensorRelease => write!(f, "flow sensor release failed"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<HardwareFault> for Error {
    fn from(h: HardwareFault) -> Self {
        Self::HardwareFault(h)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
