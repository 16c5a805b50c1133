//! Image workers: conversion to marked JPEG, and metadata stripping.
//!
//! Conversion reads the XPComment field first and skips files that already
//! carry the marker, so running it twice over the same tree is a no-op the
//! second time. New JPEG data is written to `<stem>.tmp`, tagged, and only
//! then swapped in for the original. While that happens the worker holds a
//! claim on `<stem>.jpg`, so a second source with the same stem fails with
//! `TargetExists` instead of racing for the same files.

use super::{ConversionOutcome, RunContext, SkipReason};
use crate::error::{CoreResult, tool_failed_error};
use crate::external::{ToolInvocation, ToolOutput, commands};
use crate::replace::{discard_artifact, ensure_target_free, replace_with_artifact};

use ::image::ImageReader;
use ::image::codecs::jpeg::JpegEncoder;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JPEG quality used for converted images.
pub const JPEG_QUALITY: u8 = 75;

/// Extension of the temporary JPEG written next to the source.
pub const IMAGE_TEMP_EXTENSION: &str = "tmp";

/// Final extension of converted images.
pub const IMAGE_TARGET_EXTENSION: &str = "jpg";

#[must_use]
pub fn temp_path(source: &Path) -> PathBuf {
    source.with_extension(IMAGE_TEMP_EXTENSION)
}

/// Converts one image to a marked JPEG at `<stem>.jpg`.
pub fn convert_image(ctx: &RunContext, source: &Path) -> CoreResult<ConversionOutcome> {
    let exiftool = &ctx.job.tools.exiftool;

    // STEP 1: Marker check
    let probe = commands::read_comment(exiftool, source);
    let output = run_checked(ctx, &probe)?;
    if output.contains(&ctx.job.marker) {
        log::debug!("Marker present in {}", source.display());
        return Ok(ConversionOutcome::skipped(SkipReason::MarkerPresent));
    }

    // STEP 2: Decode and re-encode as JPEG at the temp path
    // Same-stem sources share the target and temp names. Hold the target
    // until the swap is done.
    let target = ensure_target_free(source, IMAGE_TARGET_EXTENSION)?;
    let _claim = ctx.claim_target(&target)?;
    let temp = temp_path(source);
    if let Err(e) = encode_jpeg(source, &temp) {
        discard_artifact(&temp);
        return Err(e);
    }
    log::debug!("Created temporary file {}", temp.display());

    // STEP 3: Tag the temp file
    let tag = commands::write_marker(exiftool, &ctx.job.marker, &temp);
    if let Err(e) = run_checked(ctx, &tag) {
        discard_artifact(&temp);
        return Err(e);
    }

    // STEP 4: Swap it in
    let final_path = replace_with_artifact(
        ctx.recycler.as_ref(),
        source,
        &temp,
        IMAGE_TARGET_EXTENSION,
    )?;
    Ok(ConversionOutcome::completed(final_path))
}

/// Clears the description, title, subject and comment fields in place.
pub fn strip_metadata(ctx: &RunContext, source: &Path) -> CoreResult<ConversionOutcome> {
    let strip = commands::strip_metadata(&ctx.job.tools.exiftool, source);
    run_checked(ctx, &strip)?;
    Ok(ConversionOutcome::completed(source))
}

fn run_checked(ctx: &RunContext, invocation: &ToolInvocation) -> CoreResult<ToolOutput> {
    let output = ctx.runner.run_quiet(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(tool_failed_error(invocation, &output))
    }
}

/// Decodes `source` (format sniffed from content) and writes it as an RGB
/// JPEG to `destination`. Alpha channels are dropped.
pub fn encode_jpeg(source: &Path, destination: &Path) -> CoreResult<()> {
    let decoded = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    let rgb = decoded.to_rgb8();

    let mut writer = BufWriter::new(File::create(destination)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;
    writer.flush()?;
    Ok(())
}
