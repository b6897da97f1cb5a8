//! Runner configuration
//!
//! Defines the scheduler commands and the defaults applied to every
//! submission: lookback window, poll interval, workspace location, log host,
//! run-as user and the permission policy that goes with it.

use qrun_core::domain::request::{
    SubmissionRequest, lookback_days_or_default, poll_interval_or_default,
};
use std::path::PathBuf;
use std::time::Duration;

use crate::workspace::SharedAccess;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Submission executable (e.g., "qsub")
    pub submit_program: String,

    /// Trace executable (e.g., "tracejob")
    pub trace_program: String,

    /// Days of accounting history searched per trace query
    pub lookback_days: u32,

    /// Wait between trace queries
    pub poll_interval: Duration,

    /// Base directory for workspaces (None = system temp dir)
    pub log_dir: Option<PathBuf>,

    /// Host qualifying out/err paths for the scheduler
    pub log_host: Option<String>,

    /// User jobs run as (None = submitting user)
    pub run_as_user: Option<String>,

    /// Workspace widening policy for run-as submissions
    pub shared_access: SharedAccess,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            submit_program: "qsub".to_string(),
            trace_program: "tracejob".to_string(),
            lookback_days: lookback_days_or_default(None),
            poll_interval: Duration::from_millis(poll_interval_or_default(None)),
            log_dir: None,
            log_host: None,
            run_as_user: None,
            shared_access: SharedAccess::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - QRUN_SUBMIT_PROGRAM (default: qsub)
    /// - QRUN_TRACE_PROGRAM (default: tracejob)
    /// - QRUN_LOOKBACK_DAYS (days, default: 1; negative or invalid uses the default)
    /// - QRUN_POLL_INTERVAL_MS (milliseconds, default: 300; negative or invalid uses the default)
    /// - QRUN_LOG_DIR (default: system temp dir)
    /// - QRUN_LOG_HOST
    /// - QRUN_RUN_AS
    /// - QRUN_SHARED_ACCESS (world or group, default: world)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::new();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let lookback_days =
            lookback_days_or_default(var("QRUN_LOOKBACK_DAYS").and_then(|s| s.parse().ok()));

        let poll_interval = Duration::from_millis(poll_interval_or_default(
            var("QRUN_POLL_INTERVAL_MS").and_then(|s| s.parse().ok()),
        ));

        let shared_access = match var("QRUN_SHARED_ACCESS") {
            Some(s) => s
                .parse::<SharedAccess>()
                .map_err(|e| anyhow::anyhow!("QRUN_SHARED_ACCESS: {}", e))?,
            None => defaults.shared_access,
        };

        Ok(Self {
            submit_program: var("QRUN_SUBMIT_PROGRAM").unwrap_or(defaults.submit_program),
            trace_program: var("QRUN_TRACE_PROGRAM").unwrap_or(defaults.trace_program),
            lookback_days,
            poll_interval,
            log_dir: var("QRUN_LOG_DIR").map(PathBuf::from),
            log_host: var("QRUN_LOG_HOST"),
            run_as_user: var("QRUN_RUN_AS"),
            shared_access,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.submit_program.trim().is_empty() {
            anyhow::bail!("submit_program cannot be empty");
        }

        if self.trace_program.trim().is_empty() {
            anyhow::bail!("trace_program cannot be empty");
        }

        Ok(())
    }

    /// Builds a request for `script` carrying this configuration's defaults
    pub fn request(&self, script: impl Into<String>) -> SubmissionRequest {
        let mut request = SubmissionRequest::new(script);
        request.lookback_days = self.lookback_days;
        request.poll_interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX);
        request.log_dir = self.log_dir.clone();
        request.log_host = self.log_host.clone();
        request.run_as_user = self.run_as_user.clone();
        request
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
