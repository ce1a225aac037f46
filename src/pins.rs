//! GPIO pin assignments for the dosing board.
//!
//! Single source of truth for the default wiring. [`HardwareConfig`]
//! takes its defaults from here rather than hard-coding pin numbers.
//!
//! [`HardwareConfig`]: crate::config::HardwareConfig

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output driving the pump relay coil.
/// The relay module is active-LOW: driving the pin low energizes it.
pub const RELAY_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Flow sensor
// ---------------------------------------------------------------------------

/// Hall-effect flow sensor pulse output, interrupt-driven.
/// Open-collector output, needs the internal pull-up.
pub const FLOW_SENSOR_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// Operator stop button (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button that requests a clean shutdown.
pub const STOP_BUTTON_GPIO: i32 = 16;
