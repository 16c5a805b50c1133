//! File discovery module for finding the files a job operates on.
//!
//! The classifier walks the whole directory tree under the job root and
//! selects regular files by a case-insensitive extension set. It never opens
//! or modifies the files it returns, so a directory can be rescanned at any
//! time. Entries are visited in file-name order within each directory, which
//! gives video jobs a deterministic processing order.

use crate::config::Operation;
use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Sources for image conversion.
pub const IMAGE_CONVERT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Sources for metadata stripping. Only files already in JPEG form.
pub const METADATA_STRIP_EXTENSIONS: &[&str] = &["jpg"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv"];

/// Suffix of the temporary file a transcode writes next to its source.
pub const VIDEO_TEMP_SUFFIX: &str = ".h265.mp4";

/// Checks whether `path` has one of `extensions`, ignoring case.
#[must_use]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Whether `path` is a transcode temp artifact (`<stem>.h265.mp4`).
#[must_use]
pub fn is_video_temp_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.len() > VIDEO_TEMP_SUFFIX.len()
                && name.to_ascii_lowercase().ends_with(VIDEO_TEMP_SUFFIX)
        })
}

/// Recursively collects regular files under `root` accepted by `predicate`.
///
/// Returns `InvalidDirectory` if `root` is not a directory. Unreadable
/// entries below the root are logged and skipped.
pub fn scan<P>(root: &Path, predicate: P) -> CoreResult<Vec<PathBuf>>
where
    P: Fn(&Path) -> bool,
{
    if !root.is_dir() {
        return Err(CoreError::InvalidDirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() && predicate(entry.path()) {
            files.push(entry.into_path());
        }
    }

    log::debug!("Found {} matching files under {}", files.len(), root.display());
    Ok(files)
}

/// Lists the source files for `operation` under `root`.
pub fn find_files(operation: Operation, root: &Path) -> CoreResult<Vec<PathBuf>> {
    match operation {
        Operation::ImageConvert => scan(root, |p| has_extension(p, IMAGE_CONVERT_EXTENSIONS)),
        Operation::MetadataStrip => scan(root, |p| has_extension(p, METADATA_STRIP_EXTENSIONS)),
        Operation::VideoTranscode => scan(root, |p| {
            has_extension(p, VIDEO_EXTENSIONS) && !is_video_temp_artifact(p)
        }),
    }
}

/// Lists stray transcode temp files left under `root` by an earlier run.
pub fn find_video_temp_artifacts(root: &Path) -> CoreResult<Vec<PathBuf>> {
    scan(root, is_video_temp_artifact)
}
