// ============================================================================
// medianorm-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern Dispatch for Console and File
//
// The core library only talks to the `log` facade. This module installs the
// backend: a console sink on stderr at the level chosen by `-v`/`-q`/
// `--log-level`, and an optional file sink that always records debug detail
// with local timestamps.
//
// The per-run error log written into the processed directory is separate
// and handled by the core library.
//
// AI-ASSISTANT-INFO: fern logger initialization for the CLI

// ---- External crate imports ----
use anyhow::{Context, Result};
use log::LevelFilter;

// ---- Standard library imports ----
use std::path::Path;

/// Target of records produced by `LogEventHandler`.
const EVENT_LOG_TARGET: &str = "medianorm_core::events";

/// Level recorded in `--log-file` regardless of console verbosity.
const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Returns the current local timestamp formatted for log lines.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Installs the global logger. Call once, before any work starts.
pub fn init(console_level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let console = fern::Dispatch::new()
        .level(console_level)
        // Events already reach the terminal through the event handlers.
        .filter(|metadata| !metadata.target().starts_with(EVENT_LOG_TARGET))
        .format(|out, message, record| {
            if record.level() <= log::Level::Warn {
                out.finish(format_args!("[{}] {}", record.level(), message));
            } else {
                out.finish(format_args!("{message}"));
            }
        })
        .chain(std::io::stderr());

    let mut root = fern::Dispatch::new().level(console_level).chain(console);

    if let Some(path) = log_file {
        let file = fern::log_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        root = root.level(console_level.max(FILE_LEVEL)).chain(
            fern::Dispatch::new()
                .level(FILE_LEVEL)
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}: {}",
                        get_timestamp(),
                        record.level(),
                        record.target(),
                        message
                    ));
                })
                .chain(file),
        );
    }

    root.apply().context("Failed to install logger")?;
    Ok(())
}
