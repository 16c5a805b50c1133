// medianorm-cli/src/lib.rs
//
// Library portion of the Medianorm CLI application.
// Contains argument definitions, presentation and command logic.

pub mod cli;
pub mod commands;
pub mod json;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands};
pub use commands::{EXIT_CANCELLED, OutputOptions, dispatch};
pub use json::JsonEventHandler;
pub use terminal::TerminalEventHandler;
