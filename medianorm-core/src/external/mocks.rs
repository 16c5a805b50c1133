// ============================================================================
// medianorm-core/src/external/mocks.rs
// ============================================================================
//
// MOCKING INFRASTRUCTURE: Scripted ToolRunner for Tests
//
// `ScriptedToolRunner` stands in for real processes. Each program name is
// bound to a responder closure that inspects the invocation and returns a
// `MockResponse`: output lines, an exit code, files to create, or a request
// to block until the run is cancelled. Every invocation is recorded so tests
// can assert which commands ran and with which arguments.
//
// `exiftool_emulator` behaves like exiftool's XPComment read/write/strip on
// ordinary files, which is enough for marker idempotence tests.
//
// AI-ASSISTANT-INFO: Test doubles for external tool invocation

use super::{ToolInvocation, ToolOutput, ToolRunner};
use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult, tool_not_found_error};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

type Responder = Arc<dyn Fn(&ToolInvocation) -> MockResponse + Send + Sync>;

/// Scripted result of one mock invocation.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    lines: Vec<String>,
    exit_code: Option<i32>,
    not_found: bool,
    creates: Vec<PathBuf>,
    delay: Option<Duration>,
    hang_until_cancelled: bool,
}

impl MockResponse {
    /// Exit code 0 with the given output lines.
    pub fn success<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::exit(0, lines)
    }

    pub fn exit<I, S>(code: i32, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            exit_code: Some(code),
            ..Self::default()
        }
    }

    /// The program cannot be located.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Self::default()
        }
    }

    /// Creates a small file at `path` before output is delivered.
    #[must_use]
    pub fn creating(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates.push(path.into());
        self
    }

    /// Sleeps before returning, to widen scheduling windows.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// After emitting output, blocks until the cancellation token is set
    /// and then reports `CoreError::Cancelled`.
    #[must_use]
    pub fn hang_until_cancelled(mut self) -> Self {
        self.hang_until_cancelled = true;
        self
    }
}

/// `ToolRunner` that replays scripted responses and records every call.
#[derive(Clone, Default)]
pub struct ScriptedToolRunner {
    responders: Arc<Mutex<Vec<(String, Responder)>>>,
    calls: Arc<Mutex<Vec<ToolInvocation>>>,
}

impl ScriptedToolRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `program` (bare name, e.g. `ffprobe`) to a responder.
    #[must_use]
    pub fn on<F>(self, program: &str, responder: F) -> Self
    where
        F: Fn(&ToolInvocation) -> MockResponse + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((program.to_string(), Arc::new(responder)));
        self
    }

    /// Every invocation so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn calls_for(&self, program: &str) -> Vec<ToolInvocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.program_name() == program)
            .collect()
    }

    fn responder_for(&self, program: &str) -> Option<Responder> {
        self.responders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(name, _)| name == program)
            .map(|(_, responder)| Arc::clone(responder))
    }
}

impl ToolRunner for ScriptedToolRunner {
    fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: Option<&CancellationToken>,
        on_line: &mut dyn FnMut(&str),
    ) -> CoreResult<ToolOutput> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        // Mirrors the system runner, which never spawns once stopped.
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(CoreError::Cancelled);
        }

        let program = invocation.program_name();
        let Some(responder) = self.responder_for(&program) else {
            panic!("ScriptedToolRunner: no responder for command: {invocation}");
        };
        let response = responder(invocation);

        if response.not_found {
            return Err(tool_not_found_error(invocation));
        }

        for path in &response.creates {
            if let Err(e) = fs::write(path, b"mock output") {
                log::error!("ScriptedToolRunner failed to create {}: {e}", path.display());
            }
        }

        for line in &response.lines {
            on_line(line.as_str());
        }

        if response.hang_until_cancelled {
            let Some(token) = cancel else {
                panic!("ScriptedToolRunner: {program} hangs but no cancellation token was passed");
            };
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            return Err(CoreError::Cancelled);
        }

        if let Some(delay) = response.delay {
            thread::sleep(delay);
        }

        Ok(ToolOutput {
            exit_code: response.exit_code,
            lines: response.lines,
        })
    }
}

// ============================================================================
// EXIFTOOL EMULATION
// ============================================================================

const COMMENT_TAG: &[u8] = b"\n[medianorm-mock XPComment]=";

/// Responder emulating exiftool's XPComment handling on plain files.
///
/// The comment is stored as a trailer appended to the file, which image
/// decoders ignore after the end-of-image marker.
pub fn exiftool_emulator(invocation: &ToolInvocation) -> MockResponse {
    let args = invocation.args_lossy();
    let Some(file) = args.last().map(PathBuf::from) else {
        return MockResponse::exit(1, ["Error: no file specified"]);
    };
    let Ok(bytes) = fs::read(&file) else {
        return MockResponse::exit(1, [format!("Error: File not found - {}", file.display())]);
    };

    match args.first().map(String::as_str) {
        Some("-XPComment") => match read_comment(&bytes) {
            Some(comment) => MockResponse::success([format!("XP Comment                      : {comment}")]),
            None => MockResponse::success(Vec::<String>::new()),
        },
        Some("-overwrite_original") => {
            let value = args
                .get(1)
                .and_then(|arg| arg.strip_prefix("-XPComment="))
                .unwrap_or_default();
            let mut stripped = strip_comment(bytes);
            if !value.is_empty() {
                stripped.extend_from_slice(COMMENT_TAG);
                stripped.extend_from_slice(value.as_bytes());
            }
            match write_file(&file, &stripped) {
                Ok(()) => MockResponse::success(["    1 image files updated"]),
                Err(e) => MockResponse::exit(1, [format!("Error: {e}")]),
            }
        }
        _ => MockResponse::exit(1, ["Error: unsupported mock arguments"]),
    }
}

/// Reads the emulated comment of `path`, for test assertions.
#[must_use]
pub fn emulated_comment(path: &Path) -> Option<String> {
    fs::read(path).ok().and_then(|bytes| read_comment(&bytes))
}

fn read_comment(bytes: &[u8]) -> Option<String> {
    let start = find(bytes, COMMENT_TAG)? + COMMENT_TAG.len();
    Some(String::from_utf8_lossy(&bytes[start..]).into_owned())
}

fn strip_comment(mut bytes: Vec<u8>) -> Vec<u8> {
    if let Some(index) = find(&bytes, COMMENT_TAG) {
        bytes.truncate(index);
    }
    bytes
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::commands;
    use tempfile::tempdir;

    #[test]
    fn test_records_calls_and_replays_responses() {
        let runner = ScriptedToolRunner::new()
            .on("ffprobe", |_| MockResponse::success(["h264"]))
            .on("ffmpeg", |_| MockResponse::exit(1, ["boom"]));

        let probe = runner
            .run_quiet(&ToolInvocation::new("/opt/bin/ffprobe").arg("x.mkv"))
            .unwrap();
        assert!(probe.success());
        assert!(probe.contains("h264"));

        let mut seen = Vec::new();
        let encode = runner
            .run(&ToolInvocation::new("ffmpeg"), None, &mut |l| seen.push(l.to_string()))
            .unwrap();
        assert_eq!(encode.exit_code, Some(1));
        assert_eq!(seen, ["boom"]);

        assert_eq!(runner.calls().len(), 2);
        assert_eq!(runner.calls_for("ffprobe").len(), 1);
    }

    #[test]
    fn test_exiftool_emulator_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"jpegdata").unwrap();
        let runner = ScriptedToolRunner::new().on("exiftool", exiftool_emulator);
        let exiftool = Path::new("exiftool");

        let before = runner.run_quiet(&commands::read_comment(exiftool, &file)).unwrap();
        assert!(before.lines.is_empty());

        runner
            .run_quiet(&commands::write_marker(exiftool, "Marked", &file))
            .unwrap();
        assert_eq!(emulated_comment(&file).as_deref(), Some("Marked"));
        let after = runner.run_quiet(&commands::read_comment(exiftool, &file)).unwrap();
        assert!(after.contains("Marked"));

        runner
            .run_quiet(&commands::strip_metadata(exiftool, &file))
            .unwrap();
        assert_eq!(emulated_comment(&file), None);
        assert_eq!(fs::read(&file).unwrap(), b"jpegdata");
    }
}
