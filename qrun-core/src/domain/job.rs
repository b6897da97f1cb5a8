//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the scheduler at submission time
///
/// The scheduler's literal job-id string (e.g. `42.host`). It is used verbatim
/// as the key for every later trace query and is never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text returned by one query of the scheduler's trace facility
///
/// Recomputed on every poll, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSnapshot {
    pub output: String,
    pub error: String,
}

impl TraceSnapshot {
    pub fn new(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: error.into(),
        }
    }

    /// True when the trace facility had no record of the job
    pub fn is_blank(&self) -> bool {
        self.output.trim().is_empty()
    }
}

/// Job state derived from a trace snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobState {
    /// The trace facility has no record of the job in the lookback window
    NotFound,
    /// No terminal marker seen yet
    Pending,
    /// The job left the system with a recorded exit status
    Terminal {
        exit_code: i32,
        /// State word of the dequeue marker (e.g. `COMPLETE`)
        state: String,
    },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::NotFound => f.write_str("NOT_FOUND"),
            JobState::Pending => f.write_str("PENDING"),
            JobState::Terminal { exit_code, state } => {
                write!(f, "TERMINAL({}, state {})", exit_code, state)
            }
        }
    }
}
