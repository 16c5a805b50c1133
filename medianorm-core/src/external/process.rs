// ============================================================================
// medianorm-core/src/external/process.rs
// ============================================================================
//
// PROCESS INVOKER: Spawning External Tools with Live Output
//
// `SystemToolRunner` spawns a tool with piped stdout/stderr, drains both
// pipes on reader threads and delivers lines to the caller as they arrive.
// The calling thread waits on a channel with a timeout so a cancellation
// request is noticed within one poll interval, at which point the child is
// killed.
//
// Encoders such as ffmpeg rewrite their progress line with a carriage
// return, so `LineSplitter` treats `\r` as a line end as well as `\n`.
//
// AI-ASSISTANT-INFO: std::process based ToolRunner with streaming output and cancellation

// ---- Internal crate imports ----
use super::{ToolInvocation, ToolOutput, ToolRunner};
use crate::cancel::CancellationToken;
use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::{CoreError, CoreResult, tool_not_found_error, tool_start_error};

// ---- Standard library imports ----
use std::collections::VecDeque;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on lines kept for error reporting. Older lines are dropped.
pub const MAX_CAPTURED_LINES: usize = 500;

const READ_CHUNK: usize = 8 * 1024;
const EXIT_POLL: Duration = Duration::from_millis(10);

// ============================================================================
// LINE SPLITTING
// ============================================================================

/// Incremental splitter for a byte stream, ending lines at `\n` or `\r`.
///
/// Blank lines are dropped. Bytes are decoded as lossy UTF-8 per line.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a chunk and returns every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take_line() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.take_line()
    }

    fn take_line(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&bytes);
        if line.trim().is_empty() {
            None
        } else {
            Some(line.into_owned())
        }
    }
}

fn spawn_reader<R>(mut stream: R, sender: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut splitter = LineSplitter::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        if sender.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("Stopped reading tool output: {e}");
                    break;
                }
            }
        }
        if let Some(line) = splitter.finish() {
            let _ = sender.send(line);
        }
    })
}

// ============================================================================
// SYSTEM RUNNER
// ============================================================================

/// `ToolRunner` backed by `std::process::Command`.
#[derive(Debug, Clone)]
pub struct SystemToolRunner {
    poll_interval: Duration,
}

impl SystemToolRunner {
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for SystemToolRunner {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: Option<&CancellationToken>,
        on_line: &mut dyn FnMut(&str),
    ) -> CoreResult<ToolOutput> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            log::debug!("Not starting {}: stop requested", invocation.program_name());
            return Err(CoreError::Cancelled);
        }
        log::debug!("Running: {invocation}");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_console_window(&mut command);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                tool_not_found_error(invocation)
            } else {
                tool_start_error(invocation, e)
            }
        })?;

        let (sender, receiver) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, sender.clone()));
        }
        drop(sender);

        let is_cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);
        let mut captured = VecDeque::new();

        // Stream lines until both pipes close.
        loop {
            if is_cancelled() {
                terminate(&mut child, invocation);
                return Err(CoreError::Cancelled);
            }
            match receiver.recv_timeout(self.poll_interval) {
                Ok(line) => {
                    on_line(line.as_str());
                    if captured.len() == MAX_CAPTURED_LINES {
                        captured.pop_front();
                    }
                    captured.push_back(line);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // A child may close its pipes before exiting.
        let status = match cancel {
            None => child.wait()?,
            Some(_) => loop {
                if is_cancelled() {
                    terminate(&mut child, invocation);
                    return Err(CoreError::Cancelled);
                }
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                thread::sleep(self.poll_interval.min(EXIT_POLL));
            },
        };

        for reader in readers {
            let _ = reader.join();
        }

        log::debug!("{} exited with {}", invocation.program_name(), describe(status));
        Ok(ToolOutput {
            exit_code: status.code(),
            lines: captured.into(),
        })
    }
}

fn terminate(child: &mut Child, invocation: &ToolInvocation) {
    log::info!("Terminating {}", invocation.program_name());
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill {}: {e}", invocation.program_name());
    }
    let _ = child.wait();
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_command: &mut Command) {}
