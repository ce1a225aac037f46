//! Host `log` backend: append-only `app.log` plus stderr, through `fern`.
//!
//! Line format: `<local time> - <LEVEL> - <message>`.  `fern::log_file`
//! opens the file in append mode, so logs from earlier runs stay.

use anyhow::Context;
use log::LevelFilter;

use crate::config::LogConfig;

const STAMP: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Level filter and line format shared by every output.
fn dispatch(level: LevelFilter) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format(STAMP),
                record.level(),
                message
            ));
        })
        .level(level)
}

/// Install the global `log` backend writing to `app.log` and stderr.
pub fn init(cfg: &LogConfig) -> anyhow::Result<()> {
    let file = fern::log_file(&cfg.app_log_path)
        .with_context(|| format!("open {}", cfg.app_log_path))?;
    dispatch(cfg.level_filter())
        .chain(file)
        .chain(std::io::stderr())
        .apply()
        .context("logger already installed")?;
    Ok(())
}
