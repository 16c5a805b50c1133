//! Subcommand implementations.

pub mod check_tools;
pub mod run;

use crate::cli::{Cli, Commands};
use anyhow::Result;

/// Exit code of a run stopped by the user (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// Output choices shared by every subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// JSON lines on stdout instead of the terminal renderer.
    pub json: bool,
    /// Print forwarded encoder lines above the progress bar.
    pub show_tool_output: bool,
    /// Mirror events into the diagnostic log (only useful with a log file).
    pub log_events: bool,
}

impl OutputOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json: cli.json,
            show_tool_output: cli.verbose > 0,
            log_events: cli.log_file.is_some(),
        }
    }
}

/// Runs the selected subcommand and returns the process exit code.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let output = OutputOptions::from_cli(&cli);
    match cli.command {
        Commands::Convert(args) => run::execute(run::convert_job(&args)?, output),
        Commands::StripMetadata(args) => run::execute(run::strip_job(&args)?, output),
        Commands::Transcode(args) => run::execute(run::transcode_job(&args)?, output),
        Commands::CheckTools(args) => check_tools::run_check_tools(&args, output),
    }
}
