//! Hardware adapters: relay output, flow sensor input, stop button.
//!
//! This is the only module that touches real peripherals.  On ESP-IDF it
//! configures GPIO through raw `esp_idf_svc::sys` calls and drives the
//! relay through an `esp_idf_svc::hal` `PinDriver`; on every other target it
//! provides a simulation backend with the same port traits.
//!
//! | Adapter          | Implements       | Target    |
//! |------------------|------------------|-----------|
//! | `EspRelayPin`    | `OutputPin`      | ESP-IDF   |
//! | `EspFlowSensor`  | `FlowSensorPort` | ESP-IDF   |
//! | `StopButton`     | shutdown source  | ESP-IDF   |
//! | `SimRelayPin`    | `OutputPin`      | host      |
//! | `SimFlowSensor`  | `FlowSensorPort` | host      |

#[cfg(target_os = "espidf")]
pub use esp::{EspFlowSensor, EspRelayPin, StopButton, relay_pin};
#[cfg(not(target_os = "espidf"))]
pub use sim::{SimFlowSensor, SimRelayPin};

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use core::ffi::c_void;
    use core::time::Duration;
    use std::sync::Arc;

    use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use crate::app::ports::FlowSensorPort;
    use crate::config::{Edge, PullMode};
    use crate::error::{HardwareFault, Result};
    use crate::sensors::PulseCounter;
    use crate::shutdown::ShutdownSignal;

    pub type EspRelayPin = PinDriver<'static, AnyOutputPin, Output>;

    /// Claim `gpio` as the relay output.
    pub fn relay_pin(gpio: i32) -> Result<EspRelayPin> {
        // SAFETY: the pin number comes from the board wiring and is not
        // claimed anywhere else in the firmware.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        PinDriver::output(pin).map_err(|_| HardwareFault::Init("relay gpio").into())
    }

    fn configure_input(gpio: i32, pull: PullMode, intr: gpio_int_type_t) -> Result<()> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: if pull == PullMode::Up {
                gpio_pullup_t_GPIO_PULLUP_ENABLE
            } else {
                gpio_pullup_t_GPIO_PULLUP_DISABLE
            },
            pull_down_en: if pull == PullMode::Down {
                gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
            } else {
                gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
            },
            intr_type: intr,
        };
        // SAFETY: plain register configuration of an input pin.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HardwareFault::Init("gpio input config").into());
        }
        Ok(())
    }

    /// Edge ISR.  `arg` is the counter leaked by [`EspFlowSensor::on_edge`].
    unsafe extern "C" fn flow_edge_isr(arg: *mut c_void) {
        // SAFETY: the pointer stays valid until `close()` has removed this
        // handler, and `increment` is a single atomic add.
        let counter = unsafe { &*(arg as *const PulseCounter) };
        counter.increment();
    }

    /// Flow sensor on a GPIO interrupt.
    pub struct EspFlowSensor {
        gpio: i32,
        pull: PullMode,
        edge: Edge,
        /// Counter handed to the ISR, reclaimed in `close()`.
        bound: Option<*const PulseCounter>,
    }

    impl EspFlowSensor {
        pub fn new(gpio: i32, pull: PullMode, edge: Edge) -> Self {
            Self {
                gpio,
                pull,
                edge,
                bound: None,
            }
        }
    }

    impl FlowSensorPort for EspFlowSensor {
        fn on_edge(&mut self, counter: Arc<PulseCounter>) -> Result<()> {
            self.close()?;

            let intr = match self.edge {
                Edge::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
                Edge::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
            };
            configure_input(self.gpio, self.pull, intr)?;

            let arg = Arc::into_raw(counter);
            // SAFETY: the ISR service install is idempotent
            // (ESP_ERR_INVALID_STATE means already installed).  The handler
            // argument outlives the registration, see `close()`.
            unsafe {
                let ret = gpio_install_isr_service(0);
                if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                    drop(Arc::from_raw(arg));
                    return Err(HardwareFault::SensorSubscribe.into());
                }
                let ret = gpio_isr_handler_add(self.gpio, Some(flow_edge_isr), arg as *mut c_void);
                if ret != ESP_OK as i32 {
                    drop(Arc::from_raw(arg));
                    return Err(HardwareFault::SensorSubscribe.into());
                }
                gpio_intr_enable(self.gpio);
            }
            self.bound = Some(arg);
            info!("flow sensor: GPIO{} bound ({:?} edge)", self.gpio, self.edge);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            let Some(arg) = self.bound.take() else {
                return Ok(());
            };
            // SAFETY: the handler is removed before the counter reference
            // held by the ISR is released.
            let ret = unsafe {
                gpio_intr_disable(self.gpio);
                gpio_isr_handler_remove(self.gpio)
            };
            if ret != ESP_OK as i32 {
                // Keep the counter alive: the ISR may still fire.
                warn!("flow sensor: handler remove failed (rc={ret})");
                return Err(HardwareFault::SensorRelease.into());
            }
            // SAFETY: `arg` came from `Arc::into_raw` in `on_edge`.
            drop(unsafe { Arc::from_raw(arg) });
            info!("flow sensor: GPIO{} released", self.gpio);
            Ok(())
        }
    }

    impl Drop for EspFlowSensor {
        fn drop(&mut self) {
            let _ = self.close();
        }
    }

    const POLL_MS: u64 = 10;
    const DEBOUNCE_MS: u64 = 50;

    /// Active-low stop button with pull-up.
    ///
    /// Polled from its own thread rather than an ISR because
    /// [`ShutdownSignal::trigger`] takes a critical section.
    pub struct StopButton;

    impl StopButton {
        /// Start watching `gpio`; a press held for the debounce period
        /// triggers `shutdown` once, then the watcher exits.
        pub fn spawn(gpio: i32, shutdown: Arc<ShutdownSignal>) -> Result<()> {
            configure_input(gpio, PullMode::Up, gpio_int_type_t_GPIO_INTR_DISABLE)?;
            std::thread::Builder::new()
                .name("stop-button".into())
                .stack_size(4096)
                .spawn(move || {
                    let mut held_ms = 0;
                    while !shutdown.is_requested() {
                        // SAFETY: read-only level access on a configured input.
                        let pressed = unsafe { gpio_get_level(gpio) } == 0;
                        held_ms = if pressed { held_ms + POLL_MS } else { 0 };
                        if held_ms >= DEBOUNCE_MS {
                            info!("stop button pressed");
                            shutdown.trigger();
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(POLL_MS));
                    }
                })
                .map_err(|_| HardwareFault::Init("stop button thread"))?;
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicBool, Ordering};
    use core::time::Duration;
    use std::sync::Arc;
    use std::thread::JoinHandle;

    use embedded_hal::digital::{ErrorType, OutputPin};
    use log::{debug, info};

    use crate::app::ports::FlowSensorPort;
    use crate::error::{HardwareFault, Result};
    use crate::sensors::PulseCounter;

    /// Simulated relay coil.  Tracks whether the pump would be running.
    pub struct SimRelayPin {
        active_low: bool,
        energized: Arc<AtomicBool>,
    }

    impl SimRelayPin {
        pub fn new(active_low: bool) -> Self {
            Self {
                active_low,
                energized: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Shared view of the coil state, for the simulated sensor.
        pub fn energized(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.energized)
        }
    }

    impl ErrorType for SimRelayPin {
        type Error = Infallible;
    }

    impl OutputPin for SimRelayPin {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.energized.store(self.active_low, Ordering::Release);
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.energized.store(!self.active_low, Ordering::Release);
            Ok(())
        }
    }

    struct Generator {
        stop: Arc<AtomicBool>,
        handle: JoinHandle<()>,
    }

    /// Simulated flow sensor: a generator thread emits edges at a fixed
    /// rate while the relay is energized.
    pub struct SimFlowSensor {
        pulse_hz: f64,
        energized: Arc<AtomicBool>,
        generator: Option<Generator>,
    }

    impl SimFlowSensor {
        pub fn new(pulse_hz: f64, energized: Arc<AtomicBool>) -> Self {
            Self {
                pulse_hz,
                energized,
                generator: None,
            }
        }
    }

    impl FlowSensorPort for SimFlowSensor {
        fn on_edge(&mut self, counter: Arc<PulseCounter>) -> Result<()> {
            self.close()?;
            if !(self.pulse_hz.is_finite() && self.pulse_hz > 0.0) {
                info!("flow sensor(sim): no pulse rate configured, sensor silent");
                return Ok(());
            }

            let period = Duration::try_from_secs_f64(1.0 / self.pulse_hz)
                .map_err(|_| HardwareFault::SensorSubscribe)?;
            let stop = Arc::new(AtomicBool::new(false));
            let energized = Arc::clone(&self.energized);
            let stop_flag = Arc::clone(&stop);
            let handle = std::thread::Builder::new()
                .name("sim-flow".into())
                .spawn(move || {
                    while !stop_flag.load(Ordering::Acquire) {
                        std::thread::sleep(period);
                        if energized.load(Ordering::Acquire) {
                            counter.increment();
                        }
                    }
                })
                .map_err(|_| HardwareFault::SensorSubscribe)?;

            self.generator = Some(Generator { stop, handle });
            info!("flow sensor(sim): {:.1} Hz while pump runs", self.pulse_hz);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            let Some(generator) = self.generator.take() else {
                return Ok(());
            };
            generator.stop.store(true, Ordering::Release);
            generator
                .handle
                .join()
                .map_err(|_| HardwareFault::SensorRelease)?;
            debug!("flow sensor(sim): generator stopped");
            Ok(())
        }
    }

    impl Drop for SimFlowSensor {
        fn drop(&mut self) {
            let _ = self.close();
        }
    }

}
