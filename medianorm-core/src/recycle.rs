//! Reversible removal of files.
//!
//! Superseded originals and stray temp files are never deleted outright. They
//! are handed to a [`Recycler`], which moves them somewhere the user can
//! restore them from: the operating system's recycle bin, or a plain
//! directory on machines without one.

use crate::config::RecycleTarget;
use crate::error::{CoreError, CoreResult};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub trait Recycler: Send + Sync {
    /// Moves `path` out of the way without destroying it.
    fn recycle(&self, path: &Path) -> CoreResult<()>;
}

/// Builds the recycler for a configured target.
pub fn recycler_for(target: &RecycleTarget) -> Arc<dyn Recycler> {
    match target {
        RecycleTarget::SystemTrash => Arc::new(SystemTrash),
        RecycleTarget::Directory(dir) => Arc::new(DirectoryRecycler::new(dir.clone())),
    }
}

fn recycle_error(path: &Path, message: impl ToString) -> CoreError {
    CoreError::Recycle {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// The operating system recycle bin, via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Recycler for SystemTrash {
    fn recycle(&self, path: &Path) -> CoreResult<()> {
        trash::delete(path).map_err(|e| recycle_error(path, e))?;
        log::debug!("Moved {} to the recycle bin", path.display());
        Ok(())
    }
}

/// Moves files into a fixed directory, renaming on name collisions.
#[derive(Debug, Clone)]
pub struct DirectoryRecycler {
    dir: PathBuf,
}

impl DirectoryRecycler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free name for `file_name` inside the directory:
    /// `a.jpg`, then `a (1).jpg`, `a (2).jpg`, ...
    fn free_destination(&self, path: &Path) -> CoreResult<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| recycle_error(path, "path has no file name"))?;
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}){extension}")))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| recycle_error(path, "no free name in recycle directory"))
    }
}

impl Recycler for DirectoryRecycler {
    fn recycle(&self, path: &Path) -> CoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| recycle_error(path, e))?;
        let destination = self.free_destination(path)?;

        if let Err(rename_err) = fs::rename(path, &destination) {
            // Different file systems: copy, then remove the source.
            log::debug!("Rename into recycle directory failed ({rename_err}), copying instead");
            fs::copy(path, &destination).map_err(|e| recycle_error(path, e))?;
            if let Err(e) = fs::remove_file(path) {
                let _ = fs::remove_file(&destination);
                return Err(recycle_error(path, e));
            }
        }

        log::debug!("Moved {} to {}", path.display(), destination.display());
        Ok(())
    }
}
