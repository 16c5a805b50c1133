//! Core library for batch media normalization using exiftool, ffprobe,
//! ffmpeg and HandBrakeCLI.
//!
//! This crate walks a directory tree and converts every matching file:
//! images become JPEGs tagged with a marker (or have their descriptive
//! metadata stripped), and videos are transcoded to H.265 in an MP4
//! container. Originals are moved to the recycle bin only after their
//! replacement exists on disk.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use medianorm_core::config::{JobBuilder, Operation};
//! use medianorm_core::events::{EventDispatcher, LogEventHandler};
//! use medianorm_core::Dispatcher;
//! use std::sync::Arc;
//!
//! let job = JobBuilder::new("/path/to/photos", Operation::ImageConvert)
//!     .use_max_cores(true)
//!     .build()?;
//!
//! let mut events = EventDispatcher::new();
//! events.add_handler(Arc::new(LogEventHandler));
//!
//! let dispatcher = Dispatcher::with_system_tools(job, events);
//! let stop = dispatcher.cancellation_token();
//! // Hand `stop` to a signal handler, then:
//! let summary = dispatcher.run()?;
//! println!("{}", summary.summary_line());
//! # drop(stop);
//! # Ok::<(), medianorm_core::CoreError>(())
//! ```

pub mod cancel;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod error_log;
pub mod events;
pub mod external;
pub mod processing;
pub mod recycle;
pub mod replace;
pub mod utils;

// Re-exports for public API
pub use cancel::CancellationToken;
pub use config::{GpuVendor, Job, JobBuilder, Operation, RecycleTarget, ToolPaths, VideoBackend};
pub use discovery::{find_files, scan};
pub use dispatcher::{Dispatcher, RunCounters};
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventDispatcher, EventHandler, RunState, RunSummary};
pub use external::{SystemToolRunner, Tool, ToolInvocation, ToolOutput, ToolRunner, check_dependency};
pub use processing::{ConversionOutcome, SkipReason};
pub use recycle::{DirectoryRecycler, Recycler, SystemTrash};
pub use utils::normalize_path;
