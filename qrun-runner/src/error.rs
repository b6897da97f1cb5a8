//! Error types for the runner
//!
//! Only staging and submission failures are errors. A job the scheduler has
//! no record of, a failed trace query and a failed cleanup all resolve to a
//! verdict or a warning instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for `JobRunner::run_job`
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors that abort a submission
#[derive(Debug, Error)]
pub enum RunError {
    /// The staging directory could not be prepared
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The script could not be written or the scheduler refused it
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Failures while preparing the staging directory
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to create workspace directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set permissions on workspace directory {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while handing the script to the scheduler
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Script body is empty")]
    EmptyScript,

    #[error("Failed to write script {path}: {source}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The submission command exited abnormally
    #[error("Submission command failed (exit_code={exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// The submission command succeeded but printed no job identifier
    #[error("No job identifier in submission output: '{stdout}'")]
    MissingJobId { stdout: String },
}

/// Subprocess-level failures talking to the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Check if the failure happened before anything reached the scheduler
    pub fn is_workspace_error(&self) -> bool {
        matches!(self, Self::Workspace(_))
    }

    /// Check if the scheduler was involved in the failure
    pub fn is_submission_error(&self) -> bool {
        matches!(self, Self::Submission(_))
    }
}
