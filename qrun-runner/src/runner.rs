//! Job runner
//!
//! Runs one submission end to end on the calling task:
//! workspace → submit → poll → collect → verdict → teardown.
//!
//! Each call owns its workspace and shares nothing with other calls, so
//! concurrent submissions are just concurrent calls.

use qrun_core::domain::job::{JobHandle, JobState, TraceSnapshot};
use qrun_core::domain::request::SubmissionRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, SchedulerError, SubmissionError};
use crate::repository::{PbsCommandRepository, SchedulerRepository};
use crate::scheduler::{CompletionPoller, Sleeper, TokioSleeper};
use crate::service::{JobSubmitter, LogSink, collector, verdict};
use crate::workspace::{CleanupWarning, ExecutionWorkspace, SharedAccess};

/// Outcome of a submission that reached the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub handle: JobHandle,
    pub state: JobState,
    /// The verdict: terminal with exit status 0
    pub success: bool,
    /// Job stdout (UTF-8, lossy); None when nothing was captured
    pub stdout: Option<String>,
    /// Job stderr (UTF-8, lossy); None when nothing was captured
    pub stderr: Option<String>,
    pub cleanup_warnings: Vec<CleanupWarning>,
}

/// Submits scripts and tracks them to completion
pub struct JobRunner {
    scheduler: Arc<dyn SchedulerRepository>,
    submitter: JobSubmitter,
    poller: CompletionPoller,
    shared_access: SharedAccess,
}

impl JobRunner {
    /// Creates a new job runner
    ///
    /// # Arguments
    /// * `scheduler` - Repository for submission and trace commands
    /// * `sleeper` - Waits between trace queries
    /// * `shared_access` - Workspace widening policy for run-as submissions
    pub fn new(
        scheduler: Arc<dyn SchedulerRepository>,
        sleeper: Arc<dyn Sleeper>,
        shared_access: SharedAccess,
    ) -> Self {
        Self {
            submitter: JobSubmitter::new(Arc::clone(&scheduler)),
            poller: CompletionPoller::new(Arc::clone(&scheduler), sleeper),
            scheduler,
            shared_access,
        }
    }

    /// Creates a runner driving the PBS commands named in `config`
    pub fn from_config(config: &Config) -> Self {
        let scheduler = Arc::new(PbsCommandRepository::new(
            config.submit_program.clone(),
            config.trace_program.clone(),
        ));
        Self::new(scheduler, Arc::new(TokioSleeper), config.shared_access)
    }

    /// Runs one script to completion
    ///
    /// # Arguments
    /// * `request` - Script and per-submission settings
    /// * `log` - Job log receiving progress and the job's output
    ///
    /// # Returns
    /// A report whose `success` is the verdict. Errors are reserved for
    /// staging and submission failures; a job that ran and failed, or that the
    /// scheduler has no record of, is `Ok` with `success == false`.
    pub async fn run_job(
        &self,
        request: &SubmissionRequest,
        log: &dyn LogSink,
    ) -> Result<JobReport> {
        if !request.has_script() {
            return Err(SubmissionError::EmptyScript.into());
        }

        let workspace = ExecutionWorkspace::create(
            request.log_dir.as_deref(),
            request.run_as_user.as_deref(),
            self.shared_access,
        )?;

        let handle = match self.submitter.submit(request, &workspace, log).await {
            Ok(handle) => handle,
            Err(e) => {
                log.error(format!("Failed to submit PBS job: {}", e));
                report_cleanup(&workspace.teardown(), log);
                return Err(e.into());
            }
        };

        let state = self
            .poller
            .wait_for_completion(
                &handle,
                request.lookback_days,
                request.poll_interval(),
                log,
            )
            .await;

        let output = collector::collect(&workspace, log).await;
        let success = verdict::verdict(&state);

        info!(
            "Job {} finished: {} ({})",
            handle,
            state,
            if success { "success" } else { "failure" }
        );

        let cleanup_warnings = workspace.teardown();
        report_cleanup(&cleanup_warnings, log);

        Ok(JobReport {
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            handle,
            state,
            success,
            cleanup_warnings,
        })
    }

    /// Runs a single trace query for an existing job
    pub async fn trace(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
    ) -> std::result::Result<TraceSnapshot, SchedulerError> {
        self.scheduler.trace(handle, lookback_days).await
    }
}

fn report_cleanup(warnings: &[CleanupWarning], log: &dyn LogSink) {
    for warning in warnings {
        log.warning(warning.to_string());
    }
    if !warnings.is_empty() {
        warn!("Workspace cleanup left {} item(s) behind", warnings.len());
    }
}
