//! Submit command handler
//!
//! Stages a script, submits it, waits for the scheduler's verdict and prints
//! the job's output.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use qrun_core::domain::job::JobState;
use qrun_core::domain::request::SubmissionRequest;
use qrun_runner::{Config, JobReport, JobRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

use crate::console::ConsoleLogSink;

/// Arguments of `qrun submit`
#[derive(Args)]
pub struct SubmitArgs {
    /// Script file to submit, or "-" to read it from stdin
    script: String,

    /// Days of accounting history searched while waiting (negative = default)
    #[arg(long, allow_negative_numbers = true)]
    days: Option<i64>,

    /// Milliseconds between trace queries (negative = default)
    #[arg(long = "interval-ms", allow_negative_numbers = true)]
    interval_ms: Option<i64>,

    /// Run the job as this user (empty = current user)
    #[arg(long)]
    run_as: Option<String>,

    /// Host qualifying the job's output paths (empty = local filesystem)
    #[arg(long)]
    log_host: Option<String>,

    /// Base directory for the staging workspace
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Environment variable for the submission, as KEY=VALUE (repeatable)
    #[arg(short, long = "env", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,

    /// Print the job report as JSON on stdout (job log goes to stderr)
    #[arg(long)]
    json: bool,
}

/// Handle `qrun submit`
pub async fn handle_submit(args: SubmitArgs, config: &Config) -> Result<ExitCode> {
    let script = read_script(&args.script).await?;
    let request = build_request(&args, config, script);

    let runner = JobRunner::from_config(config);
    let sink = if args.json {
        ConsoleLogSink::stderr()
    } else {
        ConsoleLogSink::stdout()
    };

    let report = runner
        .run_job(&request, &sink)
        .await
        .context("PBS job submission failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Applies command-line overrides on top of the configured defaults
fn build_request(args: &SubmitArgs, config: &Config, script: String) -> SubmissionRequest {
    let mut request = config.request(script);

    if let Some(days) = args.days {
        request = request.with_lookback_days(days);
    }
    if let Some(interval) = args.interval_ms {
        request = request.with_poll_interval_ms(interval);
    }
    if let Some(user) = &args.run_as {
        request = request.with_run_as_user(user.as_str());
    }
    if let Some(host) = &args.log_host {
        request = request.with_log_host(host.as_str());
    }
    if let Some(dir) = &args.log_dir {
        request = request.with_log_dir(dir.as_path());
    }
    for (key, value) in &args.env {
        request = request.with_env(key.as_str(), value.as_str());
    }

    request
}

async fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut script = String::new();
        tokio::io::stdin()
            .read_to_string(&mut script)
            .await
            .context("Failed to read script from stdin")?;
        return Ok(script);
    }

    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read script {}", source))
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Print the job verdict
fn print_report(report: &JobReport) {
    println!();
    println!("{}", "Job Report:".bold());
    println!("  Job ID:   {}", report.handle.to_string().cyan());

    match &report.state {
        JobState::Terminal { exit_code, state } => {
            println!("  State:    {}", state);
            println!("  Exit:     {}", exit_code);
        }
        other => println!("  State:    {}", other.to_string().yellow()),
    }

    println!(
        "  Success:  {}",
        if report.success {
            "✓".green()
        } else {
            "✗".red()
        }
    );

    if !report.cleanup_warnings.is_empty() {
        println!("\n{}", "Left behind:".bold());
        for warning in &report.cleanup_warnings {
            println!("  {}", warning.to_string().yellow());
        }
    }
}
