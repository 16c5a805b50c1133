//! The `convert`, `strip-metadata` and `transcode` subcommands.
//!
//! All three build a `Job`, hook up presentation and Ctrl-C, and hand the
//! job to the core dispatcher. They differ only in how the job is built.

use super::{EXIT_CANCELLED, OutputOptions};
use crate::cli::{ConvertArgs, RunArgs, StripArgs, TranscodeArgs};
use crate::json::JsonEventHandler;
use crate::terminal::TerminalEventHandler;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use medianorm_core::events::LogEventHandler;
use medianorm_core::{
    CancellationToken, CoreResult, Dispatcher, EventDispatcher, Job, JobBuilder, Operation,
    RunState,
};

use std::sync::Arc;

fn builder(run: &RunArgs, operation: Operation) -> JobBuilder {
    JobBuilder::new(run.root.clone(), operation)
        .tools(run.tools.clone().into())
        .recycle(run.recycle_target())
}

pub fn convert_job(args: &ConvertArgs) -> CoreResult<Job> {
    builder(&args.run, Operation::ImageConvert)
        .use_max_cores(args.max_cores)
        .marker(args.marker.clone())
        .build()
}

pub fn strip_job(args: &StripArgs) -> CoreResult<Job> {
    builder(&args.run, Operation::MetadataStrip)
        .use_max_cores(args.max_cores)
        .build()
}

pub fn transcode_job(args: &TranscodeArgs) -> CoreResult<Job> {
    builder(&args.run, Operation::VideoTranscode)
        .video_backend(args.backend.into())
        .gpu(args.gpu.map(Into::into))
        .build()
}

/// Runs `job` to the end and maps its final state to an exit code.
pub fn execute(job: Job, output: OutputOptions) -> Result<i32> {
    let operation = job.operation;
    info!("Processing {} for {}", job.root.display(), operation);
    debug!("Job: {job:?}");

    let mut events = EventDispatcher::new();
    if output.json {
        events.add_handler(Arc::new(JsonEventHandler::new()));
    } else {
        events.add_handler(Arc::new(TerminalEventHandler::new(output.show_tool_output)));
    }
    if output.log_events {
        events.add_handler(Arc::new(LogEventHandler));
    }

    let dispatcher = Dispatcher::with_system_tools(job, events);
    install_interrupt_handler(dispatcher.cancellation_token());

    let summary = dispatcher
        .run()
        .with_context(|| format!("{} aborted", capitalize(&operation.to_string())))?;

    Ok(match summary.state {
        RunState::Cancelled => EXIT_CANCELLED,
        _ => 0,
    })
}

/// First Ctrl-C requests a cooperative stop; a second one exits at once.
fn install_interrupt_handler(cancel: CancellationToken) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            eprintln!("Interrupted again, exiting.");
            std::process::exit(EXIT_CANCELLED);
        }
        eprintln!("Stopping after the current file... (Ctrl-C again to exit now)");
        cancel.cancel();
    });
    if let Err(e) = result {
        warn!("Could not install Ctrl-C handler: {e}");
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
