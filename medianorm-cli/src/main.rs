// ============================================================================
// medianorm-cli/src/main.rs
// ============================================================================
//
// MEDIANORM CLI: Main Entry Point
//
// Parses arguments, installs the logger and runs the selected subcommand.
// Exit codes: 0 when the run finished, 1 on any run-level error (invalid
// directory, missing tool, bad arguments), 130 when stopped with Ctrl-C.
//
// AI-ASSISTANT-INFO: Entry point for the medianorm binary

// ---- Internal crate imports ----
use medianorm_cli::{Cli, dispatch, logging};

// ---- External crate imports ----
use clap::Parser;
use console::style;

// ---- Standard library imports ----
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.console_level(), cli.log_file.as_deref()) {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        process::exit(1);
    }

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            log::debug!("Run failed: {e:?}");
            eprintln!("{} {e:#}", style("Error:").red().bold());
            1
        }
    };
    process::exit(code);
}
