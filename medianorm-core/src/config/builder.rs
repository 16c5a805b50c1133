// ============================================================================
// medianorm-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for Job
//
// This module implements the builder used to create `Job` instances. The
// builder fills in defaults for everything but the root directory and the
// operation, and validates the result so a run never starts on a directory
// that does not exist.
//
// KEY COMPONENTS:
// - JobBuilder: Fluent builder for Job
// - build(): Root normalization and validation
//
// AI-ASSISTANT-INFO: Builder pattern implementation for Job

// ---- Standard library imports ----
use std::path::PathBuf;
use std::time::Duration;

// ---- Internal crate imports ----
use super::{
    DEFAULT_ERROR_LOG_NAME, DEFAULT_MARKER, DEFAULT_POLL_INTERVAL, GpuVendor, Job, Operation,
    RecycleTarget, ToolPaths, VideoBackend, VideoOptions,
};
use crate::error::{CoreError, CoreResult};
use crate::utils::normalize_path;

/// Builder for creating [`Job`] instances.
///
/// # Examples
///
/// ```rust,no_run
/// use medianorm_core::config::{JobBuilder, Operation, VideoBackend, GpuVendor};
///
/// let job = JobBuilder::new("/path/to/videos", Operation::VideoTranscode)
///     .video_backend(VideoBackend::HandBrake)
///     .gpu(Some(GpuVendor::Nvidia))
///     .build()?;
/// # Ok::<(), medianorm_core::CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JobBuilder {
    // Required fields
    root: PathBuf,
    operation: Operation,

    // Optional fields with defaults
    use_max_cores: bool,
    video: VideoOptions,
    marker: String,
    tools: ToolPaths,
    recycle: RecycleTarget,
    poll_interval: Duration,
    error_log_name: String,
}

impl JobBuilder {
    pub fn new(root: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            root: root.into(),
            operation,
            use_max_cores: false,
            video: VideoOptions::default(),
            marker: DEFAULT_MARKER.to_string(),
            tools: ToolPaths::default(),
            recycle: RecycleTarget::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_log_name: DEFAULT_ERROR_LOG_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn use_max_cores(mut self, enabled: bool) -> Self {
        self.use_max_cores = enabled;
        self
    }

    #[must_use]
    pub fn video_backend(mut self, backend: VideoBackend) -> Self {
        self.video.backend = backend;
        self
    }

    /// Selects a hardware encoder. `None` uses the software encoder.
    #[must_use]
    pub fn gpu(mut self, vendor: Option<GpuVendor>) -> Self {
        self.video.gpu = vendor;
        self
    }

    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn recycle(mut self, target: RecycleTarget) -> Self {
        self.recycle = target;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn error_log_name(mut self, name: impl Into<String>) -> Self {
        self.error_log_name = name.into();
        self
    }

    /// Validates the configuration and produces the job.
    ///
    /// # Errors
    ///
    /// `InvalidDirectory` when the root is not an existing directory;
    /// `InvalidConfig` for an empty marker, a zero poll interval, an empty
    /// error log name, or a recycle directory inside the root (it would be
    /// rescanned as input).
    pub fn build(self) -> CoreResult<Job> {
        if !self.root.is_dir() {
            return Err(CoreError::InvalidDirectory(self.root));
        }
        let root = normalize_path(&self.root)?;

        if self.marker.trim().is_empty() {
            return Err(CoreError::InvalidConfig("marker must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.error_log_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "error log name must not be empty".into(),
            ));
        }

        let recycle = match self.recycle {
            RecycleTarget::Directory(dir) => {
                let dir = normalize_path(&dir)?;
                if dir.starts_with(&root) {
                    return Err(CoreError::InvalidConfig(format!(
                        "recycle directory {} must be outside {}",
                        dir.display(),
                        root.display()
                    )));
                }
                RecycleTarget::Directory(dir)
            }
            RecycleTarget::SystemTrash => RecycleTarget::SystemTrash,
        };

        Ok(Job {
            root,
            operation: self.operation,
            use_max_cores: self.use_max_cores,
            video: self.video,
            marker: self.marker,
            tools: self.tools,
            recycle,
            poll_interval: self.poll_interval,
            error_log_name: self.error_log_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_IMAGE_WORKERS, DEFAULT_MARKER};
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let dir = tempdir().unwrap();
        let job = JobBuilder::new(dir.path(), Operation::ImageConvert)
            .build()
            .unwrap();

        assert!(job.root.is_absolute());
        assert_eq!(job.marker, DEFAULT_MARKER);
        assert_eq!(job.image_workers(), DEFAULT_IMAGE_WORKERS);
        assert_eq!(job.video, VideoOptions::default());
        assert_eq!(job.recycle, RecycleTarget::SystemTrash);
        assert_eq!(job.error_log_path(), job.root.join("error_log.txt"));
    }

    #[test]
    fn test_max_cores_uses_available_parallelism() {
        let dir = tempdir().unwrap();
        let job = JobBuilder::new(dir.path(), Operation::ImageConvert)
            .use_max_cores(true)
            .build()
            .unwrap();
        let expected = std::thread::available_parallelism().unwrap().get();
        assert_eq!(job.image_workers(), expected);
    }

    #[test]
    fn test_missing_root_is_invalid_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = JobBuilder::new(&missing, Operation::VideoTranscode)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDirectory(p) if p == missing));
    }

    #[test]
    fn test_file_root_is_invalid_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        std::fs::write(&file, b"x").unwrap();
        let err = JobBuilder::new(&file, Operation::MetadataStrip)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDirectory(_)));
    }

    #[test]
    fn test_rejects_empty_marker_and_zero_interval() {
        let dir = tempdir().unwrap();
        let err = JobBuilder::new(dir.path(), Operation::ImageConvert)
            .marker("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));

        let err = JobBuilder::new(dir.path(), Operation::VideoTranscode)
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_recycle_dir_inside_root() {
        let dir = tempdir().unwrap();
        let err = JobBuilder::new(dir.path(), Operation::VideoTranscode)
            .recycle(RecycleTarget::Directory(dir.path().join("bin")))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));

        let outside = tempdir().unwrap();
        let job = JobBuilder::new(dir.path(), Operation::VideoTranscode)
            .recycle(RecycleTarget::Directory(outside.path().to_path_buf()))
            .build()
            .unwrap();
        assert!(matches!(job.recycle, RecycleTarget::Directory(_)));
    }
}
