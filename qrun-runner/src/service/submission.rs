//! Submission service
//!
//! Stages the script into the workspace and hands it to the scheduler:
//! - Writing the request body to the workspace `script` file
//! - Building the submission arguments (stream redirection, run-as flags)
//! - Extracting the scheduler-assigned job identifier from the command output

use qrun_core::domain::job::JobHandle;
use qrun_core::domain::request::SubmissionRequest;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::SubmissionError;
use crate::repository::SchedulerRepository;
use crate::service::log_buffer::LogSink;
use crate::workspace::{ExecutionWorkspace, qualify_path};

/// Umask handed to the scheduler for run-as submissions
const RUN_AS_UMASK: &str = "umask=022";

/// Submits staged scripts to the batch scheduler
pub struct JobSubmitter {
    scheduler: Arc<dyn SchedulerRepository>,
}

impl JobSubmitter {
    /// Creates a new job submitter
    ///
    /// # Arguments
    /// * `scheduler` - Repository used to run the submission command
    pub fn new(scheduler: Arc<dyn SchedulerRepository>) -> Self {
        Self { scheduler }
    }

    /// Writes the script and submits it
    ///
    /// # Arguments
    /// * `request` - The submission request
    /// * `workspace` - Workspace owning the script/out/err files
    /// * `log` - Job log receiving the script path and job id
    ///
    /// # Returns
    /// The scheduler's job identifier, verbatim
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        workspace: &ExecutionWorkspace,
        log: &dyn LogSink,
    ) -> Result<JobHandle, SubmissionError> {
        let script_path = workspace.script_path();

        tokio::fs::write(script_path, request.script.as_bytes())
            .await
            .map_err(|source| SubmissionError::WriteScript {
                path: script_path.to_path_buf(),
                source,
            })?;

        log.info(format!("PBS script: {}", script_path.display()));

        let args = build_submit_args(request, workspace);
        debug!("Submitting with arguments {:?}", args);

        let output = self.scheduler.submit(&args, &request.env).await?;

        if !output.success() {
            return Err(SubmissionError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.error.trim().to_string(),
            });
        }

        let handle = parse_job_id(&output.output).ok_or_else(|| SubmissionError::MissingJobId {
            stdout: output.output.trim().to_string(),
        })?;

        info!("Submitted job {}", handle);
        log.info(format!("PBS Job submitted: {}", handle));

        Ok(handle)
    }
}

/// Builds `[-P <user>] -e <err> -o <out> <script> [-W umask=022]`
///
/// Output and error paths are qualified with the log host when one is set;
/// the script path is always local.
pub fn build_submit_args(request: &SubmissionRequest, workspace: &ExecutionWorkspace) -> Vec<String> {
    let host = request.log_host.as_deref();
    let mut args = Vec::with_capacity(9);

    if let Some(user) = &request.run_as_user {
        args.push("-P".to_string());
        args.push(user.clone());
    }

    args.push("-e".to_string());
    args.push(qualify_path(workspace.err_path(), host));
    args.push("-o".to_string());
    args.push(qualify_path(workspace.out_path(), host));
    args.push(workspace.script_path().display().to_string());

    if request.run_as_user.is_some() {
        args.push("-W".to_string());
        args.push(RUN_AS_UMASK.to_string());
    }

    args
}

/// Extracts the job identifier from submission output
///
/// The identifier is the last non-blank line, which must be a single token.
/// Earlier lines (site banners, warnings) are ignored.
pub fn parse_job_id(stdout: &str) -> Option<JobHandle> {
    let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;

    if line.split_whitespace().count() != 1 {
        return None;
    }

    Some(JobHandle::new(line))
}
