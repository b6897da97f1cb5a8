//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod submit;
mod trace;

use anyhow::Result;
use clap::Subcommand;
use qrun_runner::Config;
use std::process::ExitCode;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a script and wait for its verdict
    Submit(submit::SubmitArgs),
    /// Show the scheduler's trace log for a job
    Trace {
        /// Job identifier as printed by the scheduler (e.g. 42.host)
        job_id: String,

        /// Days of accounting history to search
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - Runner configuration (environment plus global flags)
///
/// # Returns
/// The process exit code; failure when a submitted job did not pass
pub async fn handle_command(command: Commands, config: Config) -> Result<ExitCode> {
    match command {
        Commands::Submit(args) => submit::handle_submit(args, &config).await,
        Commands::Trace { job_id, days } => trace::handle_trace(&job_id, days, &config).await,
    }
}
