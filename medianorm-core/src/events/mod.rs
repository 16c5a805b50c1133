//! Typed events emitted by a run, and the handlers that consume them.
//!
//! The engine never talks to a presentation layer directly. Every status line,
//! progress update and per-file outcome is an [`Event`] passed to an
//! [`EventDispatcher`], which fans it out to the registered handlers.

use crate::config::Operation;
use crate::processing::ConversionOutcome;
use crate::utils::format_seconds;

use serde::{Serialize, Serializer};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Scanning,
    Running,
    Completed,
    Cancelled,
    /// Stopped early because a required tool is missing.
    Aborted,
}

impl RunState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Aborted
        )
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    StateChanged(RunState),

    // Human-readable lines
    Status(String),
    StatusBar(String),
    /// A progress line read from a running encoder (video only).
    ToolOutput(String),

    // Counters, emitted once per outcome
    Progress {
        percent: u8,
    },
    Remaining {
        remaining: usize,
        total: usize,
    },

    Outcome {
        path: PathBuf,
        outcome: ConversionOutcome,
    },

    Finished(RunSummary),
}

/// Terminal summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub operation: Operation,
    pub state: RunState,
    pub total: usize,
    pub processed: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

fn serialize_seconds<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl RunSummary {
    /// Renders the block printed when a run ends.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let rule = "-".repeat(42);
        let timing = match self.state {
            RunState::Completed => format!("Completed in {} seconds!", format_seconds(self.elapsed)),
            RunState::Cancelled => format!(
                "Cancelled after {} seconds ({} of {} files processed).",
                format_seconds(self.elapsed),
                self.processed,
                self.total
            ),
            _ => format!("Stopped after {} seconds.", format_seconds(self.elapsed)),
        };

        format!(
            "{rule}\nConversion Results:\n\nTotal Files: {}\nConverted: {}  Skipped: {}  Failed: {}\n{timing}\n{rule}",
            self.total, self.completed, self.skipped, self.failed
        )
    }
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirrors events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::StateChanged(state) => log::debug!("Run state: {state:?}"),
            Event::Status(line) | Event::StatusBar(line) => log::info!("{line}"),
            Event::ToolOutput(line) => log::trace!("{line}"),
            Event::Progress { percent } => log::trace!("Progress: {percent}%"),
            Event::Remaining { remaining, total } => {
                log::debug!("Remaining: {remaining}/{total}");
            }
            Event::Outcome { path, outcome } => match outcome {
                ConversionOutcome::Failed { error } => {
                    log::warn!("{}: {error}", path.display());
                }
                other => log::debug!("{}: {other}", path.display()),
            },
            Event::Finished(summary) => log::info!(
                "Finished {} ({:?}): {} completed, {} skipped, {} failed",
                summary.operation,
                summary.state,
                summary.completed,
                summary.skipped,
                summary.failed
            ),
        }
    }
}

/// Forwards every event into a channel for asynchronous consumers.
///
/// Send errors are ignored: a consumer that hung up does not stop the run.
#[derive(Debug)]
pub struct ChannelEventHandler {
    sender: Sender<Event>,
}

impl ChannelEventHandler {
    pub fn new(sender: Sender<Event>) -> Self {
        Self { sender }
    }
}

impl EventHandler for ChannelEventHandler {
    fn handle(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }
}
