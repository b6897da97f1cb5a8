//! Trace command handler

use anyhow::{Context, Result};
use colored::*;
use qrun_core::domain::job::JobHandle;
use qrun_core::domain::request::lookback_days_or_default;
use qrun_runner::{Config, JobRunner};
use std::process::ExitCode;

/// Handle `qrun trace`
///
/// Runs a single trace query and prints what the scheduler reported.
pub async fn handle_trace(job_id: &str, days: Option<i64>, config: &Config) -> Result<ExitCode> {
    let handle = JobHandle::new(job_id);
    let days = match days {
        Some(days) => lookback_days_or_default(Some(days)),
        None => config.lookback_days,
    };

    let runner = JobRunner::from_config(config);
    let snapshot = runner
        .trace(&handle, days)
        .await
        .with_context(|| format!("Failed to trace job {}", handle))?;

    if snapshot.is_blank() {
        println!(
            "{}",
            format!("No trace records for job {} in the last {} day(s)", handle, days).yellow()
        );
    } else {
        print!("{}", snapshot.output);
    }

    if !snapshot.error.trim().is_empty() {
        eprint!("{}", snapshot.error);
    }

    Ok(if snapshot.is_blank() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
