//! Qrun Runner
//!
//! Submits a script to an external batch scheduler and tracks it until the
//! scheduler's trace log reports a terminal state.
//!
//! Architecture:
//! - Configuration: scheduler commands and submission defaults from environment
//! - Repository: the scheduler's submission and trace commands
//! - Services: script staging and submission, output collection, verdict
//! - Scheduler: the completion polling state machine
//! - Workspace: per-submission staging directory and its cleanup
//!
//! # Example
//!
//! ```no_run
//! use qrun_runner::{Config, InMemoryLogBuffer, JobRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let runner = JobRunner::from_config(&config);
//!     let log = InMemoryLogBuffer::new();
//!
//!     let report = runner.run_job(&config.request("echo hi"), &log).await?;
//!     println!("job {} success={}", report.handle, report.success);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod repository;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{RunError, SchedulerError, SubmissionError, WorkspaceError};
pub use runner::{JobReport, JobRunner};
pub use service::{InMemoryLogBuffer, LogSink};
pub use workspace::{CleanupWarning, ExecutionWorkspace, SharedAccess};
