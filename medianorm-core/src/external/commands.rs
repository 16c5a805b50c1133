//! Argument lists for the wrapped tools.
//!
//! These follow the tools' command-line contracts exactly; the wrapped
//! programs are treated as opaque, so changing an argument here changes
//! behavior in ways the engine cannot observe.

use super::ToolInvocation;
use crate::config::{GpuVendor, VideoBackend, VideoOptions};

use std::path::Path;

/// Metadata fields cleared by a metadata strip.
pub const STRIPPED_FIELDS: [&str; 7] = [
    "-XPComment=",
    "-XPSubject=",
    "-XMP-dc:Subject=",
    "-XMP-dc:Title=",
    "-XMP-dc:Description=",
    "-XMP-microsoft:LastKeywordXMP=",
    "-Comment=",
];

/// Substring of the codec probe's output that identifies H.265.
pub const HEVC_CODEC_NAME: &str = "hevc";

/// `exiftool -XPComment <file>`
pub fn read_comment(exiftool: &Path, file: &Path) -> ToolInvocation {
    ToolInvocation::new(exiftool).arg("-XPComment").arg(file)
}

/// `exiftool -overwrite_original -XPComment=<marker> <file>`
pub fn write_marker(exiftool: &Path, marker: &str, file: &Path) -> ToolInvocation {
    ToolInvocation::new(exiftool)
        .arg("-overwrite_original")
        .arg(format!("-XPComment={marker}"))
        .arg(file)
}

/// `exiftool -overwrite_original <each stripped field>= <file>`
pub fn strip_metadata(exiftool: &Path, file: &Path) -> ToolInvocation {
    ToolInvocation::new(exiftool)
        .arg("-overwrite_original")
        .args(STRIPPED_FIELDS)
        .arg(file)
}

/// Prints the codec name of the first video stream, one value per line.
pub fn probe_codec(ffprobe: &Path, file: &Path) -> ToolInvocation {
    ToolInvocation::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name",
            "-of",
            "default=nw=1:nk=1",
        ])
        .arg(file)
}

#[must_use]
pub fn ffmpeg_encoder(gpu: Option<GpuVendor>) -> &'static str {
    match gpu {
        Some(GpuVendor::Nvidia) => "hevc_nvenc",
        Some(GpuVendor::Amd) => "hevc_amf",
        None => "libx265",
    }
}

#[must_use]
pub fn handbrake_encoder(gpu: Option<GpuVendor>) -> &'static str {
    match gpu {
        Some(GpuVendor::Nvidia) => "nvenc_h265",
        Some(GpuVendor::Amd) => "vce_h265",
        None => "x265",
    }
}

/// Transcode `input` to H.265 at `output` with the configured backend.
///
/// `encoder_program` is the ffmpeg or HandBrakeCLI path matching
/// `options.backend`.
pub fn transcode(
    encoder_program: &Path,
    options: VideoOptions,
    input: &Path,
    output: &Path,
) -> ToolInvocation {
    match options.backend {
        VideoBackend::Ffmpeg => ToolInvocation::new(encoder_program)
            .arg("-i")
            .arg(input)
            .args(["-c:v", ffmpeg_encoder(options.gpu)])
            .args(["-c:a", "copy", "-map_metadata", "-1", "-sn", "-y"])
            .arg(output),
        VideoBackend::HandBrake => ToolInvocation::new(encoder_program)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(["--encoder", handbrake_encoder(options.gpu)])
            .args([
                "--audio",
                "1,1",
                "--aencoder",
                "copy",
                "--optimize",
                "--no-markers",
            ]),
    }
}

/// Whether an encoder output line reports progress and should be forwarded.
#[must_use]
pub fn is_progress_line(backend: VideoBackend, line: &str) -> bool {
    let keywords: &[&str] = match backend {
        VideoBackend::Ffmpeg => &["frame", "fps", "bitrate", "speed"],
        VideoBackend::HandBrake => &["Encoding", "Progress", "Complete"],
    };
    keywords.iter().any(|keyword| line.contains(keyword))
}
