//! Event sink adapters.
//!
//! [`LogEventSink`] writes every [`AppEvent`] through the `log` facade
//! (serial console on ESP-IDF, `app.log` plus stderr on the host).
//! [`JsonlCycleLog`] is the host-side durable record: one JSON object per
//! completed cycle, appended to a file that is never rewritten.

use log::{debug, error, info};

use crate::app::events::{AppEvent, StopReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(cfg) => {
                info!(
                    "START | window={}ms idle={}ms stabilize={}ms pulses/unit={}",
                    cfg.window_duration.as_millis(),
                    cfg.idle_interval.as_millis(),
                    cfg.stabilization_delay.as_millis(),
                    cfg.pulses_per_unit_volume,
                );
            }
            AppEvent::PhaseChanged { from, to } => {
                debug!("PHASE | {} -> {}", from, to);
            }
            AppEvent::Cycle(r) => {
                info!("PULSE COUNT IN: {:.2}s: {}", r.elapsed_seconds, r.pulse_count);
                info!(
                    "CYCLE | #{} | +{:.4} | total={:.4} | flow={:.3}/min",
                    r.cycle, r.incremental_volume, r.total_volume, r.flow_rate_per_minute,
                );
            }
            AppEvent::Fault { phase, error } => {
                error!("FAULT | phase={} | {}", phase, error);
            }
            AppEvent::Stopped(report) => {
                let reason = match report.stop {
                    StopReason::Interrupted => "interrupted",
                    StopReason::Completed => "cycle limit",
                    StopReason::Fault { .. } => "fault",
                };
                info!(
                    "STOP | {} | cycles={} | total={:.4} | exit={}",
                    reason,
                    report.cycles_completed,
                    report.total_volume,
                    report.exit_code(),
                );
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use jsonl::JsonlCycleLog;

#[cfg(not(target_os = "espidf"))]
mod jsonl {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};

    use log::warn;
    use serde_json::Value;

    use crate::app::events::{AppEvent, CycleRecord};
    use crate::app::ports::EventSink;

    /// Append-only cycle log, one JSON object per line.
    ///
    /// Every line is the [`CycleRecord`] plus a local wall-clock
    /// `timestamp`.  Write failures are logged and the run continues.
    pub struct JsonlCycleLog {
        path: PathBuf,
        file: File,
    }

    impl JsonlCycleLog {
        /// Open (or create) `path` in append mode.
        pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
            let path = path.as_ref().to_path_buf();
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Ok(Self { path, file })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn append(&mut self, record: &CycleRecord) -> io::Result<()> {
            let mut value = serde_json::to_value(record)?;
            if let Value::Object(fields) = &mut value {
                let now = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
                fields.insert("timestamp".into(), Value::String(now.to_string()));
            }
            let mut line = serde_json::to_string(&value)?;
            line.push('\n');
            // One write per record so a crash never leaves half a line
            // behind a complete one.
            self.file.write_all(line.as_bytes())?;
            self.file.flush()
        }
    }

    impl EventSink for JsonlCycleLog {
        fn emit(&mut self, event: &AppEvent) {
            if let AppEvent::Cycle(record) = event {
                if let Err(e) = self.append(record) {
                    warn!("cycle log {}: write failed: {e}", self.path.display());
                }
            }
        }
    }

}
