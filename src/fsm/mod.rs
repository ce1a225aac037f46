//! Duty-cycle phases.
//!
//! ```text
//!        engage pump              reset counter, open window
//!  IDLE ────────────▶ STABILIZING ───────────────────▶ SAMPLING
//!    ▲                                                    │
//!    │ idle interval elapsed        disengage, measure    │
//!    └──────────────────────── DRAINING ◀─────────────────┘
//!
//!  Any phase ──[shutdown signal | fault]──▶ SHUTDOWN (terminal)
//! ```
//!
//! The phase enum is pure data; the controller owns the side effects of
//! each transition.  Every non-terminal phase has exactly one successor
//! on the normal path, and `Shutdown` is reachable from all of them.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Pump off, waiting to start the next cycle.
    Idle = 0,
    /// Pump on, flow settling before the window opens.
    Stabilizing = 1,
    /// Pump on, pulses counted against the window.
    Sampling = 2,
    /// Pump off, window evaluated, residual flow settling.
    Draining = 3,
    /// Terminal: teardown has run or is running.
    Shutdown = 4,
}

impl Phase {
    /// Successor on the normal (no shutdown, no fault) path.
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Stabilizing,
            Self::Stabilizing => Self::Sampling,
            Self::Sampling => Self::Draining,
            Self::Draining => Self::Idle,
            Self::Shutdown => Self::Shutdown,
        }
    }

    /// Phases in which the pump relay is commanded on.
    pub fn pump_engaged(self) -> bool {
        matches!(self, Self::Stabilizing | Self::Sampling)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Shutdown
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Stabilizing => "Stabilizing",
            Self::Sampling => "Sampling",
            Self::Draining => "Draining",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
