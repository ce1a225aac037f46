//! Shutdown channel between the operator-abort source and the control loop.
//!
//! ```text
//! ┌──────────────────┐  trigger()  ┌──────────────────┐
//! │ SIGINT handler / │────────────▶│  ShutdownSignal  │──▶ Clock::sleep wakes
//! │ stop-button ISR  │             │ (latched + wake) │──▶ loop boundary check
//! └──────────────────┘             └──────────────────┘
//! ```
//!
//! The request is latched in an `AtomicBool` so every later boundary check
//! sees it, and mirrored into an `embassy-sync` [`Signal`] so a sleeper
//! blocked inside `Clock::sleep` is woken immediately instead of at the
//! end of its timer.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

pub struct ShutdownSignal {
    requested: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    /// Request shutdown.  Lock-free on the latch; safe from a signal
    /// handler thread or an ISR-deferred callback.  Repeated calls are
    /// harmless.
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::AcqRel) {
            log::warn!("shutdown requested");
        }
        self.wake.signal(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Resolves once shutdown has been requested (immediately if it
    /// already was).
    pub async fn wait(&self) {
        if self.is_requested() {
            return;
        }
        self.wake.wait().await;
    }
}
