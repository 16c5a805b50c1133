// ============================================================================
// medianorm-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Progress Bar and Status Lines
//
// `TerminalEventHandler` renders run events for a human at a terminal:
//
// - Status lines are printed on stdout, styled by kind (completed, skipped,
//   error) with `console`.
// - Status bar text and encoder progress lines become the message of an
//   `indicatif` progress bar on stderr. The bar is hidden automatically
//   when stderr is not a terminal.
// - Remaining-file counts drive the bar position.
//
// AI-ASSISTANT-INFO: Terminal rendering of engine events for the CLI

// ---- External crate imports ----
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use medianorm_core::{Event, EventHandler, RunState};

// ---- Standard library imports ----
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";

/// Renders events as a progress bar plus styled status lines.
pub struct TerminalEventHandler {
    bar: ProgressBar,
    show_tool_output: bool,
}

impl TerminalEventHandler {
    /// `show_tool_output` also prints every forwarded encoder line above the bar.
    pub fn new(show_tool_output: bool) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self {
            bar,
            show_tool_output,
        }
    }

    /// Prints a line on stdout without tearing the progress bar.
    fn print(&self, line: String) {
        self.bar.suspend(|| println!("{line}"));
    }
}

impl EventHandler for TerminalEventHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::StateChanged(RunState::Running) => {
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
            Event::StateChanged(state) if state.is_terminal() => {
                self.bar.finish_and_clear();
            }
            Event::StateChanged(_) => {}
            Event::Status(line) => self.print(styled_status(line)),
            Event::StatusBar(line) => self.bar.set_message(line.clone()),
            Event::ToolOutput(line) => {
                if self.show_tool_output {
                    self.print(style(line).dim().to_string());
                }
                self.bar.set_message(line.clone());
            }
            Event::Remaining { remaining, total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(total.saturating_sub(*remaining) as u64);
            }
            Event::Progress { .. } | Event::Outcome { .. } => {}
            Event::Finished(summary) => {
                self.bar.finish_and_clear();
                let closing = match summary.state {
                    RunState::Completed | RunState::Cancelled => {
                        style(summary.operation.completion_message()).green().to_string()
                    }
                    _ => style("Run aborted.").red().bold().to_string(),
                };
                println!("{closing}");
            }
        }
    }
}

fn styled_status(line: &str) -> String {
    if line.starts_with("Error processing") || line.starts_with("Aborted:") {
        style(line).red().to_string()
    } else if line.starts_with("Completed:") || line.ends_with("converted to H.265!") {
        style(line).green().to_string()
    } else if line.starts_with("Skipping") || line == "Processing stopped by user." {
        style(line).yellow().to_string()
    } else if line.starts_with("---") {
        style(line).bold().to_string()
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styled_status_keeps_text() {
        console::set_colors_enabled(false);
        for line in [
            "Error processing /a.png: boom",
            "Completed: /a.jpg",
            "Skipping /b.jpg, comment found.",
            "Total Files: 3",
        ] {
            assert_eq!(styled_status(line), line);
        }
    }

    #[test]
    fn test_remaining_drives_bar_position() {
        let handler = TerminalEventHandler::new(false);
        handler.handle(&Event::Remaining {
            remaining: 3,
            total: 5,
        });
        assert_eq!(handler.bar.length(), Some(5));
        assert_eq!(handler.bar.position(), 2);
    }
}
