//! JSON event output for `--json`.
//!
//! Every engine event becomes one JSON object on its own line, so wrapper
//! scripts can follow a run without parsing terminal text.

use medianorm_core::{Event, EventHandler};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes one JSON line per event.
pub struct JsonEventHandler {
    output: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventHandler {
    /// Handler writing to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
        }
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn write_json(&self, value: serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            if let Ok(line) = serde_json::to_string(&value) {
                let _ = writeln!(output, "{line}");
                let _ = output.flush();
            }
        }
    }
}

impl Default for JsonEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts one event to its JSON line.
pub fn event_to_json(event: &Event, timestamp: u64) -> serde_json::Value {
    match event {
        Event::StateChanged(state) => json!({
            "type": "state",
            "state": state,
            "timestamp": timestamp
        }),
        Event::Status(line) => json!({
            "type": "status",
            "message": line,
            "timestamp": timestamp
        }),
        Event::StatusBar(line) => json!({
            "type": "status_bar",
            "message": line,
            "timestamp": timestamp
        }),
        Event::ToolOutput(line) => json!({
            "type": "tool_output",
            "line": line,
            "timestamp": timestamp
        }),
        Event::Progress { percent } => json!({
            "type": "progress",
            "percent": percent,
            "timestamp": timestamp
        }),
        Event::Remaining { remaining, total } => json!({
            "type": "remaining",
            "remaining": remaining,
            "total": total,
            "timestamp": timestamp
        }),
        Event::Outcome { path, outcome } => json!({
            "type": "outcome",
            "path": path,
            "outcome": outcome,
            "timestamp": timestamp
        }),
        Event::Finished(summary) => json!({
            "type": "finished",
            "summary": summary,
            "timestamp": timestamp
        }),
    }
}

impl EventHandler for JsonEventHandler {
    fn handle(&self, event: &Event) {
        self.write_json(event_to_json(event, Self::get_timestamp()));
    }
}
