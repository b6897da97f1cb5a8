//! Qrun CLI
//!
//! Command-line interface for submitting scripts to a PBS batch scheduler and
//! waiting for their verdict.

mod commands;
mod console;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use qrun_runner::Config;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qrun")]
#[command(about = "Submit PBS jobs and wait for their result", long_about = None)]
struct Cli {
    /// Submission executable
    #[arg(long, global = true)]
    submit_program: Option<String>,

    /// Trace executable
    #[arg(long, global = true)]
    trace_program: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrun_runner=info,qrun_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = load_config()?;
    if let Some(program) = cli.submit_program {
        config.submit_program = program;
    }
    if let Some(program) = cli.trace_program {
        config.trace_program = program;
    }
    config.validate()?;

    handle_command(cli.command, config).await
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("Ignoring environment configuration ({:#}), using defaults", e);
            Ok(Config::default())
        }
    }
}
