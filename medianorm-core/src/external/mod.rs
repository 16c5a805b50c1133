// ============================================================================
// medianorm-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Invocation of exiftool, ffprobe, ffmpeg and HandBrakeCLI
//
// This module encapsulates every interaction with the wrapped command-line
// tools. Workers describe what to run as a `ToolInvocation` and hand it to a
// `ToolRunner`; the runner streams output lines back while the process is
// alive and returns the exit status with a bounded tail of captured output.
//
// KEY COMPONENTS:
// - ToolInvocation / ToolOutput: Command description and captured result
// - ToolRunner: Trait seam between workers and real processes
// - SystemToolRunner: std::process implementation (process.rs)
// - Command constructors with fixed argument lists (commands.rs)
// - ScriptedToolRunner: Test double (mocks.rs)
// - Dependency checking
//
// AI-ASSISTANT-INFO: External tool invocation abstractions and dependency checks

// ---- Internal crate imports ----
use crate::cancel::CancellationToken;
use crate::config::{Job, Operation, ToolPaths, VideoBackend};
use crate::error::{CoreError, CoreResult, tool_not_found_error};

// ---- Standard library imports ----
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Exact argument lists for every wrapped tool
pub mod commands;

/// Scripted test double for `ToolRunner`
pub mod mocks;

/// Process-backed `ToolRunner`
pub mod process;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use process::{LineSplitter, SystemToolRunner};

// ============================================================================
// INVOCATION AND OUTPUT
// ============================================================================

/// A program and its arguments, ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bare program name (`ffprobe` for `/usr/bin/ffprobe`).
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Arguments as UTF-8 (lossy), for assertions and logging.
    #[must_use]
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Renders the full command line as it appears in logs and the error log.
impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Non-empty output lines from stdout and stderr, tail-bounded.
    pub lines: Vec<String>,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Substring match across all captured lines.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

// ============================================================================
// RUNNER TRAIT
// ============================================================================

/// Runs an external tool, streaming its output.
///
/// `on_line` receives every non-empty line of combined stdout/stderr as it
/// is read, with both `\n` and `\r` treated as line ends. When `cancel` is
/// given and becomes set while the tool runs, the process is killed and
/// `CoreError::Cancelled` is returned.
///
/// Implementations return `CoreError::ToolNotFound` when the program cannot
/// be located. A non-zero exit is *not* an error here; callers decide what
/// an exit status means via [`ToolOutput::success`].
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: Option<&CancellationToken>,
        on_line: &mut dyn FnMut(&str),
    ) -> CoreResult<ToolOutput>;

    /// Runs without streaming or cancellation.
    fn run_quiet(&self, invocation: &ToolInvocation) -> CoreResult<ToolOutput> {
        self.run(invocation, None, &mut |_| {})
    }
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// An external program the engine may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Exiftool,
    Ffprobe,
    Ffmpeg,
    HandBrake,
}

impl Tool {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Tool::Exiftool => "exiftool",
            Tool::Ffprobe => "ffprobe",
            Tool::Ffmpeg => "ffmpeg",
            Tool::HandBrake => "HandBrakeCLI",
        }
    }

    /// Argument that prints the version and exits.
    #[must_use]
    pub fn version_arg(self) -> &'static str {
        match self {
            Tool::Exiftool => "-ver",
            Tool::Ffprobe | Tool::Ffmpeg => "-version",
            Tool::HandBrake => "--version",
        }
    }

    #[must_use]
    pub fn path(self, tools: &ToolPaths) -> &Path {
        match self {
            Tool::Exiftool => &tools.exiftool,
            Tool::Ffprobe => &tools.ffprobe,
            Tool::Ffmpeg => &tools.ffmpeg,
            Tool::HandBrake => &tools.handbrake,
        }
    }

    /// Tools a job cannot run without, in the order they are first used.
    #[must_use]
    pub fn required_for(job: &Job) -> Vec<Tool> {
        Self::needed_by(job.operation, job.video.backend)
    }

    /// Same as [`required_for`](Self::required_for), before a job exists.
    #[must_use]
    pub fn needed_by(operation: Operation, backend: VideoBackend) -> Vec<Tool> {
        match operation {
            Operation::ImageConvert | Operation::MetadataStrip => vec![Tool::Exiftool],
            Operation::VideoTranscode => match backend {
                VideoBackend::Ffmpeg => vec![Tool::Ffprobe, Tool::Ffmpeg],
                VideoBackend::HandBrake => vec![Tool::Ffprobe, Tool::HandBrake],
            },
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that `program` can be started by running its version command.
///
/// Any exit status counts as found; only a failure to locate the binary is
/// reported, as `CoreError::ToolNotFound` carrying the searched `PATH`.
pub fn check_dependency(
    runner: &dyn ToolRunner,
    tool: Tool,
    program: &Path,
) -> CoreResult<ToolOutput> {
    let invocation = ToolInvocation::new(program).arg(tool.version_arg());
    match runner.run_quiet(&invocation) {
        Ok(output) => {
            log::debug!("Found dependency {}: {}", tool, program.display());
            Ok(output)
        }
        Err(CoreError::ToolNotFound { .. }) => {
            log::warn!("Dependency '{}' not found.", program.display());
            Err(tool_not_found_error(&invocation))
        }
        Err(e) => Err(e),
    }
}
