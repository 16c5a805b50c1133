// ============================================================================
// medianorm-core/src/processing/video.rs
// ============================================================================
//
// VIDEO PROCESSING: Per-File H.265 Transcode
//
// This module holds the video worker and the housekeeping that runs before
// a video job scans its directory.
//
// WORKFLOW (per file):
// 1. Probe the codec of the first video stream with ffprobe
// 2. Already HEVC: rename a non-MP4 container to `.mp4` and skip
// 3. Otherwise transcode to `<stem>.h265.mp4`, forwarding progress lines
// 4. On a clean exit with the temp file present, swap it in as `<stem>.mp4`
//
// The temp file is removed whenever the transcode does not complete, so a
// failed or cancelled encode leaves the source exactly as it was.
//
// AI-ASSISTANT-INFO: Video transcode worker and leftover temp-file cleanup

// ---- Internal crate imports ----
use super::{ConversionOutcome, RunContext, SkipReason};
use crate::config::VideoBackend;
use crate::discovery::{VIDEO_TEMP_SUFFIX, find_video_temp_artifacts, has_extension};
use crate::error::{CoreError, CoreResult, tool_failed_error};
use crate::events::Event;
use crate::external::commands::{self, HEVC_CODEC_NAME};
use crate::replace::{discard_artifact, replace_with_artifact};
use crate::utils::display_name;

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

/// Container extension of transcoded videos.
pub const VIDEO_TARGET_EXTENSION: &str = "mp4";

/// Temporary transcode output for `source` (`clip.mkv` -> `clip.h265.mp4`).
#[must_use]
pub fn temp_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{VIDEO_TEMP_SUFFIX}"))
}

// ============================================================================
// HOUSEKEEPING
// ============================================================================

/// Moves `*.h265.mp4` files left by an interrupted run to the recycler.
///
/// Returns how many were moved. Failures are logged and do not stop the run.
pub fn recycle_leftovers(ctx: &RunContext) -> CoreResult<usize> {
    let mut moved = 0;
    for leftover in find_video_temp_artifacts(&ctx.job.root)? {
        match ctx.recycler.recycle(&leftover) {
            Ok(()) => {
                moved += 1;
                ctx.status_bar(format!(
                    "Moved leftover file to recycle bin: {}",
                    display_name(&leftover)
                ));
            }
            Err(e) => log::warn!("Could not recycle leftover {}: {e}", leftover.display()),
        }
    }
    Ok(moved)
}

// ============================================================================
// WORKER
// ============================================================================

/// Runs one video through probe, transcode and replace.
pub fn transcode_video(ctx: &RunContext, source: &Path) -> CoreResult<ConversionOutcome> {
    // STEP 1: PROBE CODEC
    if is_hevc(ctx, source)? {
        // STEP 2: ALREADY H.265
        let renamed_to = rename_to_mp4(ctx, source)?;
        return Ok(ConversionOutcome::skipped(SkipReason::AlreadyHevc { renamed_to }));
    }

    // STEP 3: TRANSCODE
    // A stop that arrived during the codec check must not start an encoder.
    if ctx.cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    ctx.status_bar(format!("Processing {}", source.display()));
    ctx.status_bar(format!("Converting {} to H.265...", source.display()));

    let options = ctx.job.video;
    let program = match options.backend {
        VideoBackend::Ffmpeg => &ctx.job.tools.ffmpeg,
        VideoBackend::HandBrake => &ctx.job.tools.handbrake,
    };
    let temp = temp_path(source);
    let invocation = commands::transcode(program, options, source, &temp);

    let mut forward = |line: &str| {
        if commands::is_progress_line(options.backend, line) {
            ctx.emit(Event::ToolOutput(line.trim().to_string()));
        }
    };

    match ctx.runner.run(&invocation, Some(&ctx.cancel), &mut forward) {
        Ok(output) if output.success() => {}
        Ok(output) => {
            discard_artifact(&temp);
            return Err(tool_failed_error(&invocation, &output));
        }
        Err(e) => {
            discard_artifact(&temp);
            return Err(e);
        }
    }

    // STEP 4: REPLACE ORIGINAL
    let final_path = replace_with_artifact(
        ctx.recycler.as_ref(),
        source,
        &temp,
        VIDEO_TARGET_EXTENSION,
    )?;
    Ok(ConversionOutcome::completed(final_path))
}

fn is_hevc(ctx: &RunContext, source: &Path) -> CoreResult<bool> {
    let probe = commands::probe_codec(&ctx.job.tools.ffprobe, source);
    let output = ctx.runner.run_quiet(&probe)?;
    if !output.success() {
        return Err(tool_failed_error(&probe, &output));
    }
    Ok(output.contains(HEVC_CODEC_NAME))
}

/// Renames an HEVC file in a non-MP4 container to `.mp4`. No re-encode.
///
/// Leaves the file alone when the `.mp4` name is already taken.
fn rename_to_mp4(ctx: &RunContext, source: &Path) -> CoreResult<Option<PathBuf>> {
    if has_extension(source, &[VIDEO_TARGET_EXTENSION]) {
        return Ok(None);
    }

    let target = source.with_extension(VIDEO_TARGET_EXTENSION);
    if target.exists() {
        log::warn!(
            "{} is already H.265 but {} exists; leaving it in place",
            source.display(),
            target.display()
        );
        return Ok(None);
    }

    fs::rename(source, &target).map_err(|e| {
        CoreError::FileSystem(format!(
            "Failed to rename {} to {}: {e}",
            source.display(),
            target.display()
        ))
    })?;
    ctx.status(format!("Renamed {} to {}", source.display(), target.display()));
    Ok(Some(target))
}
