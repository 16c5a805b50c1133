// ============================================================================
// medianorm-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Batch Conversion Engine
//
// This module defines the error taxonomy used throughout medianorm-core.
// Per-file errors are converted into `ConversionOutcome::Failed` at the worker
// boundary; run-fatal errors (a missing external tool) abort the whole run.
//
// KEY COMPONENTS:
// - CoreError: Every failure the engine can report
// - CoreResult: Result alias used by all public functions
// - Helper constructors for structured tool errors
//
// AI-ASSISTANT-INFO: Error types and helper constructors for medianorm-core

// ---- Internal crate imports ----
use crate::external::{ToolInvocation, ToolOutput};

// ---- External crate imports ----
use thiserror::Error;

// ---- Standard library imports ----
use std::path::PathBuf;

/// Errors produced by the batch conversion engine.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The root directory of a run does not exist or is not a directory.
    #[error("Invalid directory: {0}")]
    InvalidDirectory(PathBuf),

    /// A job was configured with values the engine cannot work with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external tool binary could not be located. Fatal to the whole run.
    #[error("Required tool '{tool}' was not found")]
    ToolNotFound {
        tool: String,
        command: String,
        search_path: String,
    },

    /// An external tool could not be started for a reason other than absence.
    #[error("Failed to start '{command}': {source}")]
    ToolStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran but did not exit successfully.
    #[error("Command `{command}` failed with {}", describe_exit(*exit_code))]
    ToolExecution {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// An expected artifact was not produced.
    #[error("Expected output file does not exist: {0}")]
    MissingArtifact(PathBuf),

    /// The final target name is occupied by an unrelated file.
    #[error("Refusing to overwrite existing file: {0}")]
    TargetExists(PathBuf),

    /// A file could not be moved to the recycle location.
    #[error("Failed to move {path} to the recycle bin: {message}")]
    Recycle { path: PathBuf, message: String },

    /// A rename or other file system step failed.
    #[error("File system error: {0}")]
    FileSystem(String),

    /// A worker panicked while processing a file.
    #[error("Worker panicked: {0}")]
    WorkerPanic(String),

    /// The run was stopped cooperatively. Not reported as a failure.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory traversal error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for medianorm-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether this error implies every remaining file would fail the same way.
    #[must_use]
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, CoreError::ToolNotFound { .. })
    }
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

// ============================================================================
// HELPER CONSTRUCTORS
// ============================================================================

/// Builds a `ToolNotFound` error for an invocation, capturing the `PATH`
/// that was searched.
pub fn tool_not_found_error(invocation: &ToolInvocation) -> CoreError {
    let search_path = std::env::var_os("PATH")
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<PATH not set>".to_string());

    CoreError::ToolNotFound {
        tool: invocation.program_name(),
        command: invocation.to_string(),
        search_path,
    }
}

/// Builds a `ToolExecution` error from an invocation and its captured output.
pub fn tool_failed_error(invocation: &ToolInvocation, output: &ToolOutput) -> CoreError {
    CoreError::ToolExecution {
        command: invocation.to_string(),
        exit_code: output.exit_code,
        output: output.text(),
    }
}

/// Builds a `ToolStart` error for an invocation that could not be spawned.
pub fn tool_start_error(invocation: &ToolInvocation, source: std::io::Error) -> CoreError {
    CoreError::ToolStart {
        command: invocation.to_string(),
        source,
    }
}
