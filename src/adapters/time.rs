//! System clock adapter.
//!
//! Implements the [`Clock`] port for both targets.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** uses `std::time::Instant` for
//!   host-side simulation.
//!
//! Sleeping races an `embassy_time::Timer` against
//! [`ShutdownSignal::wait`], so an operator abort cuts a window or idle
//! wait short instead of waiting for the timer to expire.

use core::time::Duration;

use futures_lite::future;

use crate::app::ports::Clock;
use crate::error::{Error, Result};
use crate::shutdown::ShutdownSignal;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn uptime(&self) -> Duration {
        Duration::from_micros(unsafe { esp_idf_svc::sys::esp_timer_get_time() } as u64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration, shutdown: &ShutdownSignal) -> Result<()> {
        if shutdown.is_requested() {
            return Err(Error::Interrupted);
        }
        let ticks = embassy_time::Duration::from_micros(duration.as_micros() as u64);

        future::block_on(future::or(
            async {
                embassy_time::Timer::after(ticks).await;
                Ok(())
            },
            async {
                shutdown.wait().await;
                Err(Error::Interrupted)
            },
        ))
    }
}
