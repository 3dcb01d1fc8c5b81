use std::io::{self, Write};

use colored::*;
use geminify_core::{LiveView, Notification, Notifier};

/// Streams the response to stdout and shows toasts on stderr.
pub struct TerminalUi {
    /// Paste mode: nothing is streamed, the caller prints the result at the end.
    quiet: bool,
    shown: String,
}

impl TerminalUi {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            shown: String::new(),
        }
    }
}

impl LiveView for TerminalUi {
    fn publish(&mut self, text: &str) -> anyhow::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut out = io::stdout().lock();
        match text.strip_prefix(self.shown.as_str()) {
            Some(delta) => out.write_all(delta.as_bytes())?,
            None => {
                writeln!(out)?;
                out.write_all(text.as_bytes())?;
            }
        }
        out.flush()?;

        self.shown.clear();
        self.shown.push_str(text);
        Ok(())
    }

    fn finish(&mut self, markdown: &str) {
        if self.quiet {
            return;
        }

        if !self.shown.is_empty() {
            println!();
            if markdown == self.shown {
                return;
            }
            println!("{}", "─".repeat(40).dimmed());
        }
        println!("{}", markdown);
        self.shown.clear();
    }
}

impl Notifier for TerminalUi {
    fn notify(&mut self, notification: Notification) {
        let message = notification.message().unwrap_or_default();
        match &notification {
            Notification::Waiting => {
                eprintln!("{}", notification.title().cyan());
            }
            Notification::Finished { .. } => {
                eprintln!("{} {} {}", "✓".green(), notification.title().green(), message.dimmed());
            }
            Notification::Failed { .. } => {
                eprintln!("{} {} {}", "✗".red(), notification.title().red().bold(), message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_mode_publishes_nothing() {
        let mut ui = TerminalUi::new(true);
        ui.publish("partial").unwrap();
        assert!(ui.shown.is_empty());
        ui.finish("final");
        assert!(ui.shown.is_empty());
    }

    #[test]
    fn test_tracks_shown_text() {
        let mut ui = TerminalUi::new(false);
        ui.publish("Hel").unwrap();
        ui.publish("Hello").unwrap();
        assert_eq!(ui.shown, "Hello");
        ui.finish("Hello");
        assert_eq!(ui.shown, "Hello");
    }
}
