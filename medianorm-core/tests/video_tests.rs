// medianorm-core/tests/video_tests.rs

mod common;

use common::{Fixture, drain, remaining_counts, status_lines, write_file};
use medianorm_core::config::{GpuVendor, Operation, VideoBackend};
use medianorm_core::events::{Event, EventHandler};
use medianorm_core::external::ToolInvocation;
use medianorm_core::external::mocks::{MockResponse, ScriptedToolRunner};
use medianorm_core::{CancellationToken, ConversionOutcome, CoreError, EventDispatcher, JobBuilder, RunState, SkipReason};

use std::fs;
use std::sync::Arc;
use std::time::Duration;

/// Reports `hevc` for files whose name contains "hevc", `h264` otherwise.
fn probe(call: &ToolInvocation) -> MockResponse {
    let file = call.args_lossy().last().cloned().unwrap_or_default();
    if file.contains("hevc") {
        MockResponse::success(["hevc"])
    } else {
        MockResponse::success(["h264"])
    }
}

/// A successful ffmpeg encode writing its output file.
fn encode(call: &ToolInvocation) -> MockResponse {
    let output = call.args_lossy().last().cloned().unwrap_or_default();
    MockResponse::success([
        "Input #0, matroska,webm, from 'input.mkv':",
        "frame=  120 fps= 30 q=28.0 size=     512kB time=00:00:04.00 bitrate=1048.6kbits/s speed=1.0x",
        "frame=  240 fps= 30 q=28.0 size=    1024kB time=00:00:08.00 bitrate=1048.6kbits/s speed=1.0x",
    ])
    .creating(output)
}

fn tools() -> ScriptedToolRunner {
    ScriptedToolRunner::new().on("ffprobe", probe).on("ffmpeg", encode)
}

fn tool_output(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ToolOutput(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_transcodes_and_recycles_original() {
    let fixture = Fixture::new();
    write_file(&fixture.path("clip.avi"), b"original video");
    let runner = tools();

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!((summary.total, summary.completed), (1, 1));
    assert_eq!(fs::read(fixture.path("clip.mp4")).unwrap(), b"mock output");
    assert!(!fixture.path("clip.avi").exists());
    assert!(!fixture.path("clip.h265.mp4").exists());
    assert_eq!(fs::read(fixture.recycled("clip.avi")).unwrap(), b"original video");

    let encode = &runner.calls_for("ffmpeg")[0];
    let args = encode.args_lossy();
    assert_eq!(args[0], "-i");
    assert!(args[1].ends_with("clip.avi"));
    assert!(args.windows(2).any(|w| w == ["-c:v", "libx265"]));
    assert!(args.last().unwrap().ends_with("clip.h265.mp4"));

    let events = drain(&events);
    let output = tool_output(&events);
    assert!(output.iter().any(|l| l.starts_with("frame=  120")));
    assert!(!output.iter().any(|l| l.starts_with("Input #0")));
    assert_eq!(output.last().map(String::as_str), Some("Progress: 1/1"));

    let lines = status_lines(&events);
    assert!(lines.iter().any(|l| l.starts_with("Converting ") && l.ends_with("to H.265...")));
    assert!(lines.iter().any(|l| l.ends_with("converted to H.265!")));
    assert_eq!(lines.last().map(String::as_str), Some("Video processing completed."));
}

#[test]
fn test_hevc_in_other_container_is_renamed_without_encoding() {
    let fixture = Fixture::new();
    write_file(&fixture.path("hevc-movie.mkv"), b"already hevc");
    write_file(&fixture.path("hevc-final.mp4"), b"already mp4");
    let runner = tools();

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!((summary.skipped, summary.completed), (2, 0));
    assert!(runner.calls_for("ffmpeg").is_empty());
    assert!(!fixture.path("hevc-movie.mkv").exists());
    assert_eq!(fs::read(fixture.path("hevc-movie.mp4")).unwrap(), b"already hevc");
    assert_eq!(fs::read(fixture.path("hevc-final.mp4")).unwrap(), b"already mp4");

    let events = drain(&events);
    let renamed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Outcome {
                outcome: ConversionOutcome::Skipped { reason: SkipReason::AlreadyHevc { renamed_to } },
                ..
            } => Some(renamed_to.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(renamed, [None, Some(fixture.path("hevc-movie.mp4"))]);
    assert!(status_lines(&events).iter().any(|l| l.ends_with(", already H.265")));
}

#[test]
fn test_hevc_rename_keeps_existing_mp4() {
    let fixture = Fixture::new();
    write_file(&fixture.path("hevc-a.mkv"), b"mkv");
    write_file(&fixture.path("hevc-a.mp4"), b"mp4");
    let runner = tools();

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(fs::read(fixture.path("hevc-a.mkv")).unwrap(), b"mkv");
    assert_eq!(fs::read(fixture.path("hevc-a.mp4")).unwrap(), b"mp4");
}

#[test]
fn test_videos_are_processed_one_at_a_time_in_order() {
    let fixture = Fixture::new();
    for name in ["c.mov", "a.mkv", "b/inner.wmv"] {
        write_file(&fixture.path(name), b"v");
    }
    let runner = tools();

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    dispatcher.run().unwrap();

    let names = ["a.mkv", "inner.wmv", "c.mov"];
    let order: Vec<(String, &str)> = runner
        .calls()
        .iter()
        .map(|call| {
            let file = call
                .args_lossy()
                .iter()
                .find_map(|arg| names.into_iter().find(|n| arg.ends_with(n)))
                .unwrap_or_default();
            (call.program_name(), file)
        })
        .collect();
    assert_eq!(
        order,
        [
            ("ffprobe".to_string(), "a.mkv"),
            ("ffmpeg".to_string(), "a.mkv"),
            ("ffprobe".to_string(), "inner.wmv"),
            ("ffmpeg".to_string(), "inner.wmv"),
            ("ffprobe".to_string(), "c.mov"),
            ("ffmpeg".to_string(), "c.mov"),
        ]
    );
    assert_eq!(remaining_counts(&drain(&events)), [3, 2, 1, 0]);
}

#[test]
fn test_encoder_failure_leaves_source_and_removes_temp() {
    let fixture = Fixture::new();
    write_file(&fixture.path("bad.mkv"), b"source");
    let runner = ScriptedToolRunner::new().on("ffprobe", probe).on("ffmpeg", |call| {
        let output = call.args_lossy().last().cloned().unwrap_or_default();
        MockResponse::exit(1, ["Conversion failed!"]).creating(output)
    });

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.failed, 1);
    assert_eq!(fs::read(fixture.path("bad.mkv")).unwrap(), b"source");
    assert!(!fixture.path("bad.h265.mp4").exists());
    assert!(!fixture.path("bad.mp4").exists());

    let log = fixture.error_log();
    assert!(log.contains("Command: ffmpeg -i"));
    assert!(log.contains("Return Code: 1"));
    assert!(log.contains("Conversion failed!"));
}

#[test]
fn test_clean_exit_without_output_is_a_failure() {
    let fixture = Fixture::new();
    write_file(&fixture.path("ghost.avi"), b"source");
    let runner = ScriptedToolRunner::new()
        .on("ffprobe", probe)
        .on("ffmpeg", |_| MockResponse::success(Vec::<String>::new()));

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.failed, 1);
    assert!(fixture.path("ghost.avi").exists());
    assert!(fixture.error_log().contains("Expected output file does not exist"));
}

#[test]
fn test_probe_failure_is_a_per_file_failure() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.mkv"), b"corrupt");
    write_file(&fixture.path("b.mkv"), b"fine");
    let runner = ScriptedToolRunner::new()
        .on("ffprobe", |call| {
            if call.args_lossy().last().is_some_and(|a| a.ends_with("a.mkv")) {
                MockResponse::exit(1, ["a.mkv: Invalid data found when processing input"])
            } else {
                MockResponse::success(["h264"])
            }
        })
        .on("ffmpeg", encode);

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!((summary.failed, summary.completed), (1, 1));
    assert!(fixture.path("a.mkv").exists());
    assert!(fixture.path("b.mp4").exists());
    assert!(fixture.error_log().contains("Invalid data found"));
}

#[test]
fn test_missing_ffprobe_aborts_before_any_file() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.mkv"), b"a");
    write_file(&fixture.path("b.mkv"), b"b");
    let runner = ScriptedToolRunner::new()
        .on("ffprobe", |_| MockResponse::not_found())
        .on("ffmpeg", encode);

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let err = dispatcher.run().unwrap_err();

    assert!(matches!(err, CoreError::ToolNotFound { ref tool, .. } if tool == "ffprobe"));
    assert_eq!(runner.calls_for("ffprobe").len(), 1);
    assert!(runner.calls_for("ffmpeg").is_empty());
    assert!(fixture.path("a.mkv").exists());
    assert!(fixture.path("b.mkv").exists());

    let log = fixture.error_log();
    assert!(log.contains("Required tool 'ffprobe' was not found"));
    assert!(log.contains("Command: ffprobe -v error"));
    assert!(log.contains("Search Path:"));

    let events = drain(&events);
    assert!(matches!(
        events.last(),
        Some(Event::Finished(s)) if s.state == RunState::Aborted && s.processed == 0
    ));
}

#[test]
fn test_leftover_temp_files_are_recycled_first() {
    let fixture = Fixture::new();
    write_file(&fixture.path("old.h265.mp4"), b"partial");
    write_file(&fixture.path("nested/other.H265.MP4"), b"partial");
    let runner = tools();

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::VideoTranscode), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.total, 0);
    assert!(runner.calls().is_empty());
    assert!(!fixture.path("old.h265.mp4").exists());
    assert!(!fixture.path("nested/other.H265.MP4").exists());
    assert!(fixture.recycled("old.h265.mp4").exists());
    assert!(fixture.recycled("other.H265.MP4").exists());
    assert!(
        status_lines(&drain(&events))
            .iter()
            .any(|l| l == "Moved leftover file to recycle bin: old.h265.mp4")
    );
}

/// Requests a stop as soon as the encoder reports progress.
struct StopOnEncoderOutput(CancellationToken);

impl EventHandler for StopOnEncoderOutput {
    fn handle(&self, event: &Event) {
        if matches!(event, Event::ToolOutput(line) if line.starts_with("frame=")) {
            self.0.cancel();
        }
    }
}

#[test]
fn test_stop_during_encode_discards_temp_and_keeps_source() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.mkv"), b"first");
    write_file(&fixture.path("b.mkv"), b"second");
    let runner = ScriptedToolRunner::new().on("ffprobe", probe).on("ffmpeg", |call| {
        let output = call.args_lossy().last().cloned().unwrap_or_default();
        MockResponse::success(["frame=   10 fps=5.0 q=30.0 size=0kB time=00:00:00.40 speed=0.2x"])
            .creating(output)
            .hang_until_cancelled()
    });

    let cancel = CancellationToken::new();
    let mut handlers = EventDispatcher::new();
    handlers.add_handler(Arc::new(StopOnEncoderOutput(cancel.clone())));
    let (dispatcher, events) =
        fixture.dispatcher_with(fixture.job(Operation::VideoTranscode), &runner, handlers, cancel);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.state, RunState::Cancelled);
    assert_eq!(summary.processed, 0);
    assert_eq!(runner.calls_for("ffprobe").len(), 1);
    assert_eq!(fs::read(fixture.path("a.mkv")).unwrap(), b"first");
    assert_eq!(fs::read(fixture.path("b.mkv")).unwrap(), b"second");
    assert!(!fixture.path("a.h265.mp4").exists());
    assert!(fixture.error_log().is_empty());

    let lines = status_lines(&drain(&events));
    assert!(lines.contains(&"Processing stopped by user.".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("Video processing completed."));
}

#[test]
fn test_stop_during_codec_check_starts_no_encoder() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.mkv"), b"first");
    write_file(&fixture.path("b.mkv"), b"second");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let runner = ScriptedToolRunner::new()
        .on("ffprobe", move |_| {
            trigger.cancel();
            MockResponse::success(["h264"])
        })
        .on("ffmpeg", encode);

    let (dispatcher, _) = fixture.dispatcher_with(
        fixture.job(Operation::VideoTranscode),
        &runner,
        EventDispatcher::new(),
        cancel,
    );
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.state, RunState::Cancelled);
    assert_eq!(summary.processed, 0);
    assert_eq!(runner.calls_for("ffprobe").len(), 1);
    assert!(runner.calls_for("ffmpeg").is_empty());
    assert_eq!(fs::read(fixture.path("a.mkv")).unwrap(), b"first");
    assert!(!fixture.path("a.h265.mp4").exists());
    assert!(fixture.error_log().is_empty());
}

#[test]
fn test_handbrake_backend_with_gpu_encoder() {
    let fixture = Fixture::new();
    write_file(&fixture.path("show.wmv"), b"wmv");
    let runner = ScriptedToolRunner::new().on("ffprobe", probe).on("HandBrakeCLI", |call| {
        let args = call.args_lossy();
        let output = args
            .iter()
            .position(|a| a == "-o")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_default();
        MockResponse::success([
            "Encoding: task 1 of 1, 42.17 % (87.29 fps, avg 90.01 fps, ETA 00h00m12s)",
            "[12:00:00] muxing: this may take awhile...",
        ])
        .creating(output)
    });

    let job = JobBuilder::new(fixture.root.path(), Operation::VideoTranscode)
        .video_backend(VideoBackend::HandBrake)
        .gpu(Some(GpuVendor::Nvidia))
        .poll_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let (dispatcher, events) = fixture.dispatcher(job, &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.completed, 1);
    assert!(fixture.path("show.mp4").exists());
    let args = runner.calls_for("HandBrakeCLI")[0].args_lossy();
    assert!(args.windows(2).any(|w| w == ["--encoder", "nvenc_h265"]));
    assert!(args.windows(2).any(|w| w == ["--aencoder", "copy"]));

    let output = tool_output(&drain(&events));
    assert!(output.iter().any(|l| l.starts_with("Encoding: task 1 of 1")));
    assert!(!output.iter().any(|l| l.contains("muxing")));
}
