//! The `check-tools` subcommand.
//!
//! Runs each tool's version command and reports whether it could be
//! started, with the `PATH` that was searched for the ones that could not.

use super::OutputOptions;
use crate::cli::CheckToolsArgs;

use anyhow::{Result, bail};
use console::style;
use medianorm_core::{CoreError, SystemToolRunner, Tool, ToolPaths, check_dependency};
use serde_json::json;

/// Every tool the engine can drive, in a stable order.
const ALL_TOOLS: [Tool; 4] = [Tool::Exiftool, Tool::Ffprobe, Tool::Ffmpeg, Tool::HandBrake];

/// Result of probing one tool.
#[derive(Debug)]
pub enum ToolStatus {
    Found { version: Option<String> },
    Missing { search_path: String },
    Broken { error: String },
}

pub fn run_check_tools(args: &CheckToolsArgs, output: OutputOptions) -> Result<i32> {
    let tools: ToolPaths = args.tools.clone().into();
    let wanted = match args.operation {
        Some(operation) => Tool::needed_by(operation.into(), args.backend.into()),
        None => ALL_TOOLS.to_vec(),
    };

    let runner = SystemToolRunner::default();
    let mut unavailable = 0;
    for tool in wanted {
        let program = tool.path(&tools);
        let status = match check_dependency(&runner, tool, program) {
            Ok(found) => ToolStatus::Found {
                version: found.lines.first().cloned(),
            },
            Err(CoreError::ToolNotFound { search_path, .. }) => ToolStatus::Missing { search_path },
            Err(e) => ToolStatus::Broken {
                error: e.to_string(),
            },
        };
        if !matches!(status, ToolStatus::Found { .. }) {
            unavailable += 1;
        }

        if output.json {
            println!("{}", status_json(tool, &program.display().to_string(), &status));
        } else {
            println!("{}", status_line(tool, &program.display().to_string(), &status));
        }
    }

    if unavailable > 0 {
        bail!("{unavailable} required tool(s) missing or unusable");
    }
    Ok(0)
}

fn status_line(tool: Tool, program: &str, status: &ToolStatus) -> String {
    match status {
        ToolStatus::Found { version } => format!(
            "{} {:<13} found ({program}{})",
            style("ok").green().bold(),
            tool.name(),
            version.as_deref().map(|v| format!(", {v}")).unwrap_or_default()
        ),
        ToolStatus::Missing { search_path } => format!(
            "{} {:<13} missing: {program} not found on PATH {search_path}",
            style("!!").red().bold(),
            tool.name()
        ),
        ToolStatus::Broken { error } => format!(
            "{} {:<13} unusable: {error}",
            style("!!").red().bold(),
            tool.name()
        ),
    }
}

fn status_json(tool: Tool, program: &str, status: &ToolStatus) -> serde_json::Value {
    match status {
        ToolStatus::Found { version } => json!({
            "type": "tool",
            "tool": tool.name(),
            "program": program,
            "status": "found",
            "version": version
        }),
        ToolStatus::Missing { search_path } => json!({
            "type": "tool",
            "tool": tool.name(),
            "program": program,
            "status": "missing",
            "search_path": search_path
        }),
        ToolStatus::Broken { error } => json!({
            "type": "tool",
            "tool": tool.name(),
            "program": program,
            "status": "unusable",
            "error": error
        }),
    }
}
