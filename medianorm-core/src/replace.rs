// ============================================================================
// medianorm-core/src/replace.rs
// ============================================================================
//
// ATOMIC REPLACE: Swapping an Original for its Converted Artifact
//
// Both workers finish by replacing a source file with a freshly produced
// temporary artifact. The sequence is:
//
//   1. The artifact must exist, otherwise nothing is touched.
//   2. The final target name must be free (or be the original itself).
//   3. The original is moved to the recycler (reversible).
//   4. The artifact is renamed to the final target name.
//
// At every step either the original or its replacement is present on disk,
// and the original stays recoverable if step 4 fails.
//
// AI-ASSISTANT-INFO: Trash-then-rename replacement protocol shared by workers

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::recycle::Recycler;

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

/// Replaces `original` with `artifact`, returning the final path
/// (`original` with its extension set to `target_extension`).
///
/// # Errors
///
/// - `MissingArtifact` if `artifact` does not exist. The original is untouched.
/// - `TargetExists` if the final name is taken by an unrelated file. The
///   artifact is discarded and the original is untouched.
/// - `Recycle` if the original could not be moved away. The artifact is
///   discarded.
/// - `FileSystem` if the final rename fails. The original is in the recycler.
pub fn replace_with_artifact(
    recycler: &dyn Recycler,
    original: &Path,
    artifact: &Path,
    target_extension: &str,
) -> CoreResult<PathBuf> {
    if !artifact.is_file() {
        return Err(CoreError::MissingArtifact(artifact.to_path_buf()));
    }

    let target = match ensure_target_free(original, target_extension) {
        Ok(target) => target,
        Err(e) => {
            discard_artifact(artifact);
            return Err(e);
        }
    };

    if let Err(e) = recycler.recycle(original) {
        discard_artifact(artifact);
        return Err(e);
    }

    fs::rename(artifact, &target).map_err(|e| {
        log::error!(
            "Original {} was recycled but the replacement could not be moved into place",
            original.display()
        );
        CoreError::FileSystem(format!(
            "Failed to rename {} to {}: {e}",
            artifact.display(),
            target.display()
        ))
    })?;

    Ok(target)
}

/// Returns the final target for `original`, or `TargetExists` when that
/// name is held by a different file.
pub fn ensure_target_free(original: &Path, target_extension: &str) -> CoreResult<PathBuf> {
    let target = original.with_extension(target_extension);
    if target.exists() && !names_same_file(original, &target) {
        return Err(CoreError::TargetExists(target));
    }
    Ok(target)
}

/// Removes a temporary artifact produced by this run, if present.
pub fn discard_artifact(artifact: &Path) {
    match fs::remove_file(artifact) {
        Ok(()) => log::debug!("Removed temporary file {}", artifact.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove temporary file {}: {e}", artifact.display()),
    }
}

// `photo.JPG` -> `photo.jpg` is the same entry on case-insensitive file systems.
fn names_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy()) && same_identity(a, b)
}

#[cfg(unix)]
fn same_identity(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(x), Ok(y)) => x.dev() == y.dev() && x.ino() == y.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_identity(_a: &Path, _b: &Path) -> bool {
    true
}
