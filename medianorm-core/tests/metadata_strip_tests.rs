// medianorm-core/tests/metadata_strip_tests.rs

mod common;

use common::{Fixture, drain, remaining_counts, status_lines, write_file};
use medianorm_core::config::Operation;
use medianorm_core::external::commands::{self, STRIPPED_FIELDS};
use medianorm_core::external::mocks::{MockResponse, ScriptedToolRunner, emulated_comment, exiftool_emulator};
use medianorm_core::{RunState, ToolRunner};

use std::fs;
use std::path::Path;

#[test]
fn test_strips_metadata_in_place() {
    let fixture = Fixture::new();
    let runner = ScriptedToolRunner::new().on("exiftool", exiftool_emulator);
    for name in ["a.jpg", "sub/b.JPG"] {
        let path = fixture.path(name);
        write_file(&path, b"jpeg-bytes");
        runner
            .run_quiet(&commands::write_marker(Path::new("exiftool"), "Holiday", &path))
            .unwrap();
    }
    write_file(&fixture.path("c.png"), b"png-bytes");

    let (dispatcher, events) = fixture.dispatcher(fixture.job(Operation::MetadataStrip), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!((summary.total, summary.completed), (2, 2));
    for name in ["a.jpg", "sub/b.JPG"] {
        let path = fixture.path(name);
        assert_eq!(emulated_comment(&path), None);
        assert_eq!(fs::read(&path).unwrap(), b"jpeg-bytes");
    }
    // Nothing is recycled by an in-place strip.
    assert_eq!(fs::read_dir(fixture.bin.path()).unwrap().count(), 0);
    assert_eq!(fs::read(fixture.path("c.png")).unwrap(), b"png-bytes");

    let events = drain(&events);
    assert_eq!(remaining_counts(&events), [2, 1, 0]);
    let lines = status_lines(&events);
    assert!(lines.iter().any(|l| l.starts_with("Completed: Removed metadata from ")));
    assert_eq!(lines.last().map(String::as_str), Some("Metadata removal completed."));
}

#[test]
fn test_strip_clears_each_descriptive_field() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.jpg"), b"jpeg-bytes");
    let runner = ScriptedToolRunner::new().on("exiftool", |_| MockResponse::success(["    1 image files updated"]));

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::MetadataStrip), &runner);
    dispatcher.run().unwrap();

    let calls = runner.calls_for("exiftool");
    assert_eq!(calls.len(), 1);
    let args = calls[0].args_lossy();
    assert_eq!(args[0], "-overwrite_original");
    for field in STRIPPED_FIELDS {
        assert!(args.iter().any(|a| a == field), "missing {field}");
    }
    assert!(args.last().unwrap().ends_with("a.jpg"));
}

#[test]
fn test_strip_failure_is_counted_and_logged() {
    let fixture = Fixture::new();
    write_file(&fixture.path("a.jpg"), b"jpeg-bytes");
    write_file(&fixture.path("b.jpg"), b"jpeg-bytes");
    let runner = ScriptedToolRunner::new().on("exiftool", |call| {
        if call.args_lossy().last().is_some_and(|a| a.ends_with("b.jpg")) {
            MockResponse::exit(1, ["Error: Not a valid JPG"])
        } else {
            MockResponse::success(["    1 image files updated"])
        }
    });

    let (dispatcher, _) = fixture.dispatcher(fixture.job(Operation::MetadataStrip), &runner);
    let summary = dispatcher.run().unwrap();

    assert_eq!((summary.completed, summary.failed), (1, 1));
    let log = fixture.error_log();
    assert!(log.contains("b.jpg"));
    assert!(log.contains("Return Code: 1"));
    assert!(log.contains("Not a valid JPG"));
}
