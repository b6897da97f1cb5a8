//! Job log sink
//!
//! The caller-facing log of a submission. Everything a user should see about
//! the job (script path, job id, state changes, the job's own stdout/stderr)
//! is written here, separately from the runner's `tracing` diagnostics.

use qrun_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Arc, Mutex};

/// Destination for job log entries
///
/// Implementations must be cheap to call and must not fail; a sink that
/// cannot deliver an entry drops it.
pub trait LogSink: Send + Sync {
    /// Adds a log entry
    ///
    /// # Arguments
    /// * `entry` - The log entry to add
    fn add_entry(&self, entry: LogEntry);

    /// Logs an info message
    fn info(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Info, message));
    }

    /// Logs a warning message
    fn warning(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Warning, message));
    }

    /// Logs an error message
    fn error(&self, message: String) {
        self.add_entry(LogEntry::now(LogLevel::Error, message));
    }
}

/// In-memory implementation of LogSink
///
/// Uses Arc<Mutex<Vec<LogEntry>>> for thread-safe access across tasks.
#[derive(Clone, Default)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryLogBuffer {
    /// Creates a new in-memory log buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all log entries from the buffer
    ///
    /// This returns all buffered entries and clears the buffer.
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.drain(..).collect()
    }

    /// Gets a snapshot of current entries without draining
    pub fn entries(&self) -> Vec<LogEntry> {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.clone()
    }

    /// Messages of all buffered entries, in order
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }
}

impl LogSink for InMemoryLogBuffer {
    fn add_entry(&self, entry: LogEntry) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push(entry);
    }
}
