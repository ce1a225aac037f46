//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter       | Implements               | Connects to                   |
//! |---------------|--------------------------|-------------------------------|
//! | `hardware`    | OutputPin, FlowSensorPort| ESP32 GPIO / host simulation  |
//! | `time`        | Clock                    | ESP32 system timer / Instant  |
//! | `log_sink`    | EventSink                | `log` facade, cycles.jsonl    |
//! | `file_logger` | fern dispatch            | app.log + stderr (host)       |

#[cfg(not(target_os = "espidf"))]
pub mod file_logger;
pub mod hardware;
pub mod log_sink;
pub mod time;
