//! Terminal job log
//!
//! Prints job log entries as they arrive.

use colored::*;
use qrun_core::domain::log::{LogEntry, LogLevel};
use qrun_runner::LogSink;

/// Job log that prints to the terminal
pub struct ConsoleLogSink {
    /// Print to stderr so stdout stays machine-readable
    to_stderr: bool,
}

impl ConsoleLogSink {
    pub fn stdout() -> Self {
        Self { to_stderr: false }
    }

    pub fn stderr() -> Self {
        Self { to_stderr: true }
    }
}

impl LogSink for ConsoleLogSink {
    fn add_entry(&self, entry: LogEntry) {
        let line = format_entry(&entry);
        if self.to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Formats a log entry as `HH:MM:SS [LEVEL] message`
fn format_entry(entry: &LogEntry) -> String {
    let level_str = format!("{:?}", entry.level).to_uppercase();
    let level_colored = match entry.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    // Relayed job output is multi-line and printed untouched
    let message = entry.message.strip_suffix('\n').unwrap_or(&entry.message);

    format!(
        "{} [{}] {}",
        entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        message
    )
}
