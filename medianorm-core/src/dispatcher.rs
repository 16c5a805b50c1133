// ============================================================================
// medianorm-core/src/dispatcher.rs
// ============================================================================
//
// DISPATCHER: Scheduling Files onto Workers and Reporting Progress
//
// A `Dispatcher` owns one run. It scans the job root, schedules every file
// onto a worker and turns the outcomes into events.
//
// SCHEDULING:
// - Image jobs run on a bounded rayon pool (2 threads, or one per logical
//   core with `use_max_cores`). All files are submitted at once and outcomes
//   are consumed in completion order over a channel.
// - Video jobs run strictly one file at a time in discovery order, after
//   stray temp files from an earlier run have been recycled.
//
// STATES: Idle -> Scanning -> Running -> Completed | Cancelled | Aborted
//
// Counters and events are only updated on the thread that called `run`, so
// `remaining` drops by exactly one per reported outcome.
//
// AI-ASSISTANT-INFO: Run orchestration, worker pool, counters and summaries

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::{Job, Operation};
use crate::discovery::find_files;
use crate::error::{CoreError, CoreResult};
use crate::events::{Event, EventDispatcher, RunState, RunSummary};
use crate::external::{SystemToolRunner, ToolRunner};
use crate::processing::image::{convert_image, strip_metadata};
use crate::processing::{ConversionOutcome, RunContext, Settled, SkipReason, settle, video};
use crate::recycle::{Recycler, recycler_for};
use crate::utils::{format_seconds, progress_percent};

// ---- Standard library imports ----
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

// ============================================================================
// COUNTERS
// ============================================================================

/// Per-run tallies. Safe to update from any thread.
#[derive(Debug)]
pub struct RunCounters {
    total: usize,
    processed: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl RunCounters {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Counts one outcome and returns the number processed so far.
    pub fn record(&self, outcome: &ConversionOutcome) -> usize {
        let bucket = match outcome {
            ConversionOutcome::Completed { .. } => &self.completed,
            ConversionOutcome::Skipped { .. } => &self.skipped,
            ConversionOutcome::Failed { .. } => &self.failed,
        };
        bucket.fetch_add(1, Ordering::AcqRel);
        self.processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    fn summary(&self, operation: Operation, state: RunState, started: Instant) -> RunSummary {
        RunSummary {
            operation,
            state,
            total: self.total,
            processed: self.processed(),
            completed: self.completed.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            elapsed: started.elapsed(),
        }
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Runs one job to completion, cancellation or abort.
pub struct Dispatcher {
    ctx: Arc<RunContext>,
}

impl Dispatcher {
    pub fn new(
        job: Job,
        runner: Arc<dyn ToolRunner>,
        recycler: Arc<dyn Recycler>,
        events: EventDispatcher,
    ) -> Self {
        Self::with_cancellation(job, runner, recycler, events, CancellationToken::new())
    }

    /// Like [`new`](Self::new), observing an existing stop flag.
    pub fn with_cancellation(
        job: Job,
        runner: Arc<dyn ToolRunner>,
        recycler: Arc<dyn Recycler>,
        events: EventDispatcher,
        cancel: CancellationToken,
    ) -> Self {
        let ctx = RunContext::new(job, runner, recycler, events, cancel);
        Self { ctx: Arc::new(ctx) }
    }

    /// Dispatcher using real processes and the configured recycle target.
    pub fn with_system_tools(job: Job, events: EventDispatcher) -> Self {
        let runner = Arc::new(SystemToolRunner::new(job.poll_interval));
        let recycler = recycler_for(&job.recycle);
        Self::new(job, runner, recycler, events)
    }

    /// A handle that stops the run from any thread. Take it before `run`.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    pub fn request_stop(&self) {
        self.ctx.cancel.cancel();
    }

    #[must_use]
    pub fn job(&self) -> &Job {
        &self.ctx.job
    }

    /// Executes the run, emitting events as it goes.
    ///
    /// Returns the summary for completed and cancelled runs. A missing tool
    /// or a failed scan aborts the run: the summary is still emitted with
    /// `RunState::Aborted` and the error is returned.
    pub fn run(self) -> CoreResult<RunSummary> {
        let ctx = &self.ctx;
        let operation = ctx.job.operation;
        let started = Instant::now();

        ctx.emit(Event::StateChanged(RunState::Idle));
        log::info!("Starting {} in {}", operation, ctx.job.root.display());

        // STEP 1: SCAN
        ctx.emit(Event::StateChanged(RunState::Scanning));
        let (counters, fatal) = match self.scan() {
            Ok(files) => {
                let counters = RunCounters::new(files.len());

                // STEP 2: PROCESS
                ctx.emit(Event::StateChanged(RunState::Running));
                ctx.emit(Event::Remaining {
                    remaining: counters.remaining(),
                    total: counters.total(),
                });
                ctx.emit(Event::Progress { percent: 0 });

                let fatal = if operation.is_video() {
                    self.run_sequential(files, &counters)
                } else {
                    self.run_pool(files, &counters).unwrap_or_else(Some)
                };
                (counters, fatal)
            }
            Err(error) => {
                log::error!("Scan of {} failed: {error}", ctx.job.root.display());
                (RunCounters::new(0), Some(error))
            }
        };

        // STEP 3: SUMMARIZE
        let state = if fatal.is_some() {
            RunState::Aborted
        } else if ctx.cancel.is_cancelled() && counters.processed() < counters.total() {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        let summary = counters.summary(operation, state, started);
        log::info!(
            "{} finished ({:?}) after {} seconds: {} of {} files processed",
            operation,
            state,
            format_seconds(summary.elapsed),
            summary.processed,
            summary.total
        );

        match state {
            RunState::Completed => {
                ctx.status(summary.summary_line());
                ctx.status_bar(operation.completion_message());
            }
            RunState::Cancelled => {
                ctx.status("Processing stopped by user.");
                ctx.status_bar(operation.completion_message());
            }
            _ => {
                if let Some(error) = &fatal {
                    ctx.status(format!("Aborted: {error}"));
                }
            }
        }
        ctx.emit(Event::StateChanged(state));
        ctx.emit(Event::Finished(summary.clone()));

        match fatal {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }

    /// Recycles stray video temp files, then lists the job's sources.
    fn scan(&self) -> CoreResult<Vec<PathBuf>> {
        let ctx = &self.ctx;
        if ctx.job.operation.is_video() {
            let moved = video::recycle_leftovers(ctx)?;
            if moved > 0 {
                log::info!("Recycled {moved} leftover temporary files");
            }
        }
        find_files(ctx.job.operation, &ctx.job.root)
    }

    /// Parallel image processing. Returns the run-fatal error, if any.
    fn run_pool(&self, files: Vec<PathBuf>, counters: &RunCounters) -> CoreResult<Option<CoreError>> {
        let workers = self.ctx.job.image_workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("medianorm-image-{i}"))
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("Failed to build worker pool: {e}")))?;
        log::debug!("Image pool started with {workers} workers");

        let worker: fn(&RunContext, &Path) -> CoreResult<ConversionOutcome> =
            match self.ctx.job.operation {
                Operation::MetadataStrip => strip_metadata,
                _ => convert_image,
            };

        let (sender, receiver) = mpsc::channel::<(PathBuf, Settled)>();
        for path in files {
            let sender = sender.clone();
            let ctx = Arc::clone(&self.ctx);
            pool.spawn(move || {
                let settled = if ctx.should_stop() {
                    Settled::Cancelled
                } else {
                    let result = catch_unwind(AssertUnwindSafe(|| worker(&ctx, &path)))
                        .unwrap_or_else(|panic| Err(CoreError::WorkerPanic(panic_message(&*panic))));
                    settle(&ctx, &path, result)
                };
                let _ = sender.send((path, settled));
            });
        }
        drop(sender);

        // Completion order. The loop ends once every task has reported.
        let mut fatal = None;
        for (path, settled) in receiver {
            match settled {
                Settled::Outcome(outcome) => self.report(counters, path, outcome),
                Settled::Cancelled => {}
                Settled::Fatal(error) => {
                    if fatal.is_none() {
                        self.ctx.abort();
                        fatal = Some(error);
                    }
                }
            }
            if self.ctx.cancel.is_cancelled() {
                log::debug!("Stop requested; waiting for running image tasks to finish");
            }
        }
        Ok(fatal)
    }

    /// One video at a time, in discovery order.
    fn run_sequential(&self, files: Vec<PathBuf>, counters: &RunCounters) -> Option<CoreError> {
        for path in files {
            if self.ctx.cancel.is_cancelled() {
                log::info!("Stop requested; not starting {}", path.display());
                break;
            }

            let result = video::transcode_video(&self.ctx, &path);
            match settle(&self.ctx, &path, result) {
                Settled::Outcome(outcome) => {
                    self.report(counters, path, outcome);
                    self.ctx.emit(Event::ToolOutput(format!(
                        "Progress: {}/{}",
                        counters.processed(),
                        counters.total()
                    )));
                }
                Settled::Cancelled => break,
                Settled::Fatal(error) => {
                    self.ctx.abort();
                    return Some(error);
                }
            }
        }
        None
    }

    /// Counts an outcome and emits its status line, the outcome itself and
    /// the updated counters.
    fn report(&self, counters: &RunCounters, path: PathBuf, outcome: ConversionOutcome) {
        let ctx = &self.ctx;
        let processed = counters.record(&outcome);

        match &outcome {
            ConversionOutcome::Completed { final_path } => match ctx.job.operation {
                Operation::ImageConvert => {
                    ctx.status(format!("Completed: {}", final_path.display()));
                }
                Operation::MetadataStrip => {
                    ctx.status(format!("Completed: Removed metadata from {}", path.display()));
                }
                Operation::VideoTranscode => {
                    ctx.status(format!("{} converted to H.265!", path.display()));
                }
            },
            ConversionOutcome::Skipped { reason } => match reason {
                SkipReason::MarkerPresent => {
                    ctx.status_bar(format!("Skipping {}, comment found.", path.display()));
                }
                SkipReason::AlreadyHevc { .. } => {
                    ctx.status_bar(format!("Skipping {}, already H.265", path.display()));
                }
            },
            ConversionOutcome::Failed { error } => {
                ctx.status(format!("Error processing {}: {error}", path.display()));
            }
        }
        log::debug!("{}: {outcome}", path.display());

        ctx.emit(Event::Outcome { path, outcome });
        ctx.emit(Event::Remaining {
            remaining: counters.total().saturating_sub(processed),
            total: counters.total(),
        });
        ctx.emit(Event::Progress {
            percent: progress_percent(processed, counters.total()),
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
