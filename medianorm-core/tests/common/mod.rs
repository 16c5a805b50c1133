// medianorm-core/tests/common/mod.rs

#![allow(dead_code)]

use medianorm_core::config::{Job, JobBuilder, Operation};
use medianorm_core::events::{ChannelEventHandler, Event, EventDispatcher};
use medianorm_core::external::mocks::ScriptedToolRunner;
use medianorm_core::recycle::DirectoryRecycler;
use medianorm_core::{CancellationToken, Dispatcher};

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// A scratch media tree plus a separate recycle directory.
pub struct Fixture {
    pub root: TempDir,
    pub bin: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            root: tempdir().expect("create root"),
            bin: tempdir().expect("create recycle dir"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn recycled(&self, name: &str) -> PathBuf {
        self.bin.path().join(name)
    }

    pub fn job(&self, operation: Operation) -> Job {
        JobBuilder::new(self.root.path(), operation)
            .poll_interval(Duration::from_millis(10))
            .build()
            .expect("valid job")
    }

    pub fn error_log(&self) -> String {
        std::fs::read_to_string(self.path("error_log.txt")).unwrap_or_default()
    }

    /// Builds a dispatcher over `runner` whose events are collected on a channel.
    pub fn dispatcher(&self, job: Job, runner: &ScriptedToolRunner) -> (Dispatcher, Receiver<Event>) {
        self.dispatcher_with(job, runner, EventDispatcher::new(), CancellationToken::new())
    }

    /// Same as `dispatcher`, with extra handlers and a caller-owned stop flag.
    pub fn dispatcher_with(
        &self,
        job: Job,
        runner: &ScriptedToolRunner,
        mut events: EventDispatcher,
        cancel: CancellationToken,
    ) -> (Dispatcher, Receiver<Event>) {
        let (sender, receiver) = mpsc::channel();
        events.add_handler(Arc::new(ChannelEventHandler::new(sender)));
        let dispatcher = Dispatcher::with_cancellation(
            job,
            Arc::new(runner.clone()),
            Arc::new(DirectoryRecycler::new(self.bin.path())),
            events,
            cancel,
        );
        (dispatcher, receiver)
    }
}

/// Writes a small real image; the format follows the extension.
pub fn write_image(path: &Path) {
    write_image_sized(path, 16, 12);
}

pub fn write_image_sized(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 128]))
        .save(path)
        .expect("write image fixture");
}

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write fixture");
}

pub fn drain(receiver: &Receiver<Event>) -> Vec<Event> {
    receiver.try_iter().collect()
}

pub fn remaining_counts(events: &[Event]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Remaining { remaining, .. } => Some(*remaining),
            _ => None,
        })
        .collect()
}

pub fn status_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Status(s) | Event::StatusBar(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}
