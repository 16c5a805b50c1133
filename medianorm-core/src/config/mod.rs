//! Configuration structures and constants for the medianorm-core library.
//!
//! A [`Job`] describes one run: which directory tree to walk, which operation
//! to perform on it, and how the external tools are to be invoked. Jobs are
//! built through [`JobBuilder`] and are immutable afterwards.

mod builder;

use serde::Serialize;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use builder::JobBuilder;

// Default constants

/// Marker written into the XPComment field of converted images.
pub const DEFAULT_MARKER: &str = "ConvertedByFrostbyte";

/// Worker pool size for image jobs when `use_max_cores` is off.
/// Kept small so the rest of the system stays responsive.
pub const DEFAULT_IMAGE_WORKERS: usize = 2;

/// How often a running transcode checks the cancellation flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Name of the per-run error log, created inside the job root.
pub const DEFAULT_ERROR_LOG_NAME: &str = "error_log.txt";

pub const DEFAULT_EXIFTOOL: &str = "exiftool";
pub const DEFAULT_FFPROBE: &str = "ffprobe";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_HANDBRAKE: &str = "HandBrakeCLI";

/// The kind of work a job performs on every matching file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Re-encode images as JPEG and tag them with the marker.
    ImageConvert,
    /// Clear description/comment metadata fields of JPEG files in place.
    MetadataStrip,
    /// Transcode videos to H.265 inside an MP4 container.
    VideoTranscode,
}

impl Operation {
    /// Whether this operation works on videos (sequential dispatch).
    #[must_use]
    pub fn is_video(self) -> bool {
        matches!(self, Operation::VideoTranscode)
    }

    /// Line emitted when a run of this operation ends.
    #[must_use]
    pub fn completion_message(self) -> &'static str {
        match self {
            Operation::ImageConvert => "Image conversion completed.",
            Operation::MetadataStrip => "Metadata removal completed.",
            Operation::VideoTranscode => "Video processing completed.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::ImageConvert => "image conversion",
            Operation::MetadataStrip => "metadata removal",
            Operation::VideoTranscode => "video transcoding",
        };
        f.write_str(label)
    }
}

/// Which encoder program drives a video transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoBackend {
    #[default]
    Ffmpeg,
    HandBrake,
}

/// Hardware encoder vendor. `None` in [`VideoOptions::gpu`] selects x265.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuVendor {
    Nvidia,
    Amd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoOptions {
    pub backend: VideoBackend,
    pub gpu: Option<GpuVendor>,
}

/// Program names or paths of the wrapped external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub exiftool: PathBuf,
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
    pub handbrake: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            exiftool: PathBuf::from(DEFAULT_EXIFTOOL),
            ffprobe: PathBuf::from(DEFAULT_FFPROBE),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            handbrake: PathBuf::from(DEFAULT_HANDBRAKE),
        }
    }
}

/// Where superseded originals and stray artifacts are moved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecycleTarget {
    /// The operating system's recycle bin.
    #[default]
    SystemTrash,
    /// A plain directory, for headless machines without a desktop trash.
    Directory(PathBuf),
}

/// An immutable description of one run.
#[derive(Debug, Clone)]
pub struct Job {
    /// Absolute, normalized root of the directory tree to process.
    pub root: PathBuf,
    pub operation: Operation,
    /// Size the image pool to every logical core instead of two workers.
    pub use_max_cores: bool,
    pub video: VideoOptions,
    pub marker: String,
    pub tools: ToolPaths,
    pub recycle: RecycleTarget,
    pub poll_interval: Duration,
    pub error_log_name: String,
}

impl Job {
    /// Number of threads in the image worker pool.
    #[must_use]
    pub fn image_workers(&self) -> usize {
        if self.use_max_cores {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(DEFAULT_IMAGE_WORKERS)
        } else {
            DEFAULT_IMAGE_WORKERS
        }
    }

    /// Location of the error log for this run.
    #[must_use]
    pub fn error_log_path(&self) -> PathBuf {
        self.root.join(&self.error_log_name)
    }
}
