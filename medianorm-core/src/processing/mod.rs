// ============================================================================
// medianorm-core/src/processing/mod.rs
// ============================================================================
//
// PROCESSING: Per-File Conversion Workers
//
// Each worker takes one source file through its state machine and returns a
// `CoreResult<ConversionOutcome>`. `settle` then turns that result into what
// the dispatcher acts on: an outcome to count and report, a cancellation
// (not counted), or a run-fatal error. Every per-file error is written to
// the run's error log before it becomes a `Failed` outcome.
//
// KEY COMPONENTS:
// - ConversionOutcome / SkipReason: Result of one file
// - RunContext: Job, tool runner, recycler, error log, events and cancel flag
// - TargetClaim: Exclusive hold on a final target name while a worker writes it
// - image: Image conversion and metadata strip workers
// - video: Video transcode worker and leftover housekeeping
//
// AI-ASSISTANT-INFO: Per-file conversion state machines and shared run context

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::Job;
use crate::error::{CoreError, CoreResult};
use crate::error_log::ErrorLog;
use crate::events::{Event, EventDispatcher};
use crate::external::ToolRunner;
use crate::recycle::Recycler;

// ---- External crate imports ----
use serde::Serialize;

// ---- Standard library imports ----
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// SUBMODULES
// ============================================================================

pub mod image;
pub mod video;

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why a file was left as it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The image's comment field already carries the marker.
    MarkerPresent,
    /// The video is already H.265. Non-MP4 containers are renamed to `.mp4`.
    AlreadyHevc { renamed_to: Option<PathBuf> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MarkerPresent => f.write_str("marker present"),
            SkipReason::AlreadyHevc { .. } => f.write_str("already H.265"),
        }
    }
}

/// Result of processing one file. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Skipped { reason: SkipReason },
    Completed { final_path: PathBuf },
    Failed { error: String },
}

impl ConversionOutcome {
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        ConversionOutcome::Skipped { reason }
    }

    #[must_use]
    pub fn completed(final_path: impl Into<PathBuf>) -> Self {
        ConversionOutcome::Completed {
            final_path: final_path.into(),
        }
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            ConversionOutcome::Completed { final_path } => {
                write!(f, "completed: {}", final_path.display())
            }
            ConversionOutcome::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

// ============================================================================
// RUN CONTEXT
// ============================================================================

/// Everything a worker needs, shared across the worker pool.
pub struct RunContext {
    pub job: Job,
    pub runner: Arc<dyn ToolRunner>,
    pub recycler: Arc<dyn Recycler>,
    pub error_log: ErrorLog,
    pub events: EventDispatcher,
    /// User stop requests.
    pub cancel: CancellationToken,
    aborted: AtomicBool,
    /// Final targets some worker is currently producing.
    claimed_targets: Mutex<HashSet<PathBuf>>,
}

impl RunContext {
    pub fn new(
        job: Job,
        runner: Arc<dyn ToolRunner>,
        recycler: Arc<dyn Recycler>,
        events: EventDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        let error_log = ErrorLog::new(job.error_log_path());
        Self {
            job,
            runner,
            recycler,
            error_log,
            events,
            cancel,
            aborted: AtomicBool::new(false),
            claimed_targets: Mutex::new(HashSet::new()),
        }
    }

    pub fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    pub fn status(&self, line: impl Into<String>) {
        self.emit(Event::Status(line.into()));
    }

    pub fn status_bar(&self, line: impl Into<String>) {
        self.emit(Event::StatusBar(line.into()));
    }

    /// Marks the run as aborted by a fatal error. Pending tasks will not start.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Whether no further file should be started.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.is_aborted()
    }

    /// Reserves `target` for the calling worker until the claim is dropped.
    ///
    /// Sources sharing a stem (`a.png`, `a.gif`) map to the same target and
    /// temp file, so only one of them may be in flight at a time.
    ///
    /// # Errors
    ///
    /// `TargetExists` when another worker holds the same target.
    pub fn claim_target(&self, target: &Path) -> CoreResult<TargetClaim<'_>> {
        let mut claimed = self
            .claimed_targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(target.to_path_buf()) {
            return Err(CoreError::TargetExists(target.to_path_buf()));
        }
        Ok(TargetClaim {
            ctx: self,
            target: target.to_path_buf(),
        })
    }
}

/// Held while a worker writes towards a final target. Released on drop.
pub struct TargetClaim<'a> {
    ctx: &'a RunContext,
    target: PathBuf,
}

impl Drop for TargetClaim<'_> {
    fn drop(&mut self) {
        self.ctx
            .claimed_targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.target);
    }
}

/// What the dispatcher does with a finished worker.
#[derive(Debug)]
pub enum Settled {
    /// Count and report.
    Outcome(ConversionOutcome),
    /// Stopped before producing an outcome. Not counted.
    Cancelled,
    /// No file in the batch can succeed. Abort the run.
    Fatal(CoreError),
}

/// Converts a worker result, logging errors to the run's error log.
pub fn settle(ctx: &RunContext, source: &Path, result: CoreResult<ConversionOutcome>) -> Settled {
    match result {
        Ok(outcome) => Settled::Outcome(outcome),
        Err(CoreError::Cancelled) => {
            log::info!("Cancelled while processing {}", source.display());
            Settled::Cancelled
        }
        Err(error) => {
            ctx.error_log.record_or_warn(source, &error);
            if error.is_fatal_to_run() {
                log::error!("Aborting run: {error}");
                Settled::Fatal(error)
            } else {
                log::warn!("Failed to process {}: {error}", source.display());
                Settled::Outcome(ConversionOutcome::Failed {
                    error: error.to_string(),
                })
            }
        }
    }
}
