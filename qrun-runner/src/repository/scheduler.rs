//! Scheduler repository
//!
//! Handles communication with the external batch scheduler:
//! - Running the submission command
//! - Querying the trace/accounting log for a job
//!
//! This is a stateless command-line client. Argument construction and output
//! interpretation live in the service and scheduler layers.

use async_trait::async_trait;
use qrun_core::domain::job::{JobHandle, TraceSnapshot};
use std::collections::HashMap;
use tokio::process::Command;
use tracing::debug;

use crate::error::SchedulerError;

/// Exit code and captured text of a scheduler command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub output: String,
    pub error: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Repository trait for operations against the batch scheduler
#[async_trait]
pub trait SchedulerRepository: Send + Sync {
    /// Runs the submission command
    ///
    /// # Arguments
    /// * `args` - Arguments for the submission command, script path included
    /// * `env` - Environment variables passed through to the command
    async fn submit(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, SchedulerError>;

    /// Queries the trace facility for a job
    ///
    /// # Arguments
    /// * `handle` - Job identifier returned at submission
    /// * `lookback_days` - Days of accounting history to search
    async fn trace(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
    ) -> Result<TraceSnapshot, SchedulerError>;
}

/// PBS/Torque implementation of SchedulerRepository
///
/// Runs `qsub` for submission and `tracejob -n <days> <job>` for trace
/// queries. Program names are configurable for wrappers and test installs.
pub struct PbsCommandRepository {
    submit_program: String,
    trace_program: String,
}

impl PbsCommandRepository {
    /// Creates a new PBS command repository
    ///
    /// # Arguments
    /// * `submit_program` - Submission executable (e.g., "qsub")
    /// * `trace_program` - Trace executable (e.g., "tracejob")
    pub fn new(submit_program: impl Into<String>, trace_program: impl Into<String>) -> Self {
        Self {
            submit_program: submit_program.into(),
            trace_program: trace_program.into(),
        }
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, SchedulerError> {
        debug!("Executing {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .envs(env)
            .output()
            .await
            .map_err(|source| SchedulerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(&output.stdout).to_string(),
            error: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(
            "{} exited with {} (stdout_len={}, stderr_len={})",
            program,
            result.exit_code,
            result.output.len(),
            result.error.len()
        );

        Ok(result)
    }
}

impl Default for PbsCommandRepository {
    fn default() -> Self {
        Self::new("qsub", "tracejob")
    }
}

#[async_trait]
impl SchedulerRepository for PbsCommandRepository {
    async fn submit(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, SchedulerError> {
        self.run(&self.submit_program, args, env).await
    }

    async fn trace(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
    ) -> Result<TraceSnapshot, SchedulerError> {
        let args = vec![
            "-n".to_string(),
            lookback_days.to_string(),
            handle.as_str().to_string(),
        ];
        let output = self.run(&self.trace_program, &args, &HashMap::new()).await?;

        Ok(TraceSnapshot::new(output.output, output.error))
    }
}
