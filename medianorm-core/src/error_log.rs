//! Append-only log of per-file failures, kept next to the processed files.
//!
//! Each entry starts with a timestamped `Error processing` line. Tool
//! failures add the command line, its return code and its captured output;
//! a missing tool adds the command and the `PATH` that was searched.

use crate::error::CoreError;

use chrono::Local;

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Writer for `<root>/error_log.txt`. Shared by every worker of a run.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry. The file is created on first use and never truncated.
    pub fn record(&self, source: &Path, error: &CoreError) -> io::Result<()> {
        let entry = render_entry(&Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(), source, error);

        // One write per entry so concurrent workers never interleave lines.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;
        file.flush()
    }

    /// Like [`record`](Self::record), but a failure to write is only logged.
    pub fn record_or_warn(&self, source: &Path, error: &CoreError) {
        if let Err(e) = self.record(source, error) {
            log::warn!("Failed to write error log {}: {e}", self.path.display());
        }
    }
}

fn render_entry(timestamp: &str, source: &Path, error: &CoreError) -> String {
    let mut entry = format!("{timestamp}: Error processing {} - {error}\n", source.display());

    match error {
        CoreError::ToolExecution {
            command,
            exit_code,
            output,
        } => {
            let code = exit_code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string());
            let _ = writeln!(entry, "Command: {command}");
            let _ = writeln!(entry, "Return Code: {code}");
            let _ = writeln!(entry, "Output: {output}");
        }
        CoreError::ToolNotFound {
            command,
            search_path,
            ..
        } => {
            let _ = writeln!(entry, "Command: {command}");
            let _ = writeln!(entry, "Search Path: {search_path}");
        }
        _ => {}
    }

    entry
}
