//! Utility functions for path handling and formatting.
//!
//! This module provides the path canonicalization used when a job is built,
//! the progress-percentage rule shared by every run, and small formatting
//! helpers used in status lines.

use crate::error::CoreResult;

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Returns an absolute, lexically normalized form of `path`.
///
/// `.` components are dropped and `..` components remove the preceding
/// component. Symlinks are not resolved, so the result names the same file
/// the user typed even when the directory tree contains links.
pub fn normalize_path(path: &Path) -> CoreResult<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a Windows prefix.
                if matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}

/// Integer progress for `processed` of `total` outcomes. Zero when `total` is zero.
#[must_use]
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = processed.min(total) * 100 / total;
    percent as u8
}

/// Formats an elapsed time the way the run summary reports it (e.g. "12.34").
#[must_use]
pub fn format_seconds(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64())
}

/// Returns the file name of `path` for display, falling back to the full path.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
