//! Submission request

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Lookback window used when none (or a negative one) is supplied
pub const DEFAULT_LOOKBACK_DAYS: u32 = 1;

/// Poll interval used when none (or a negative one) is supplied
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Everything needed to submit and track one script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Script body, written to the workspace as-is
    pub script: String,

    /// Days of accounting history searched by each trace query
    #[serde(
        default = "default_lookback_days",
        deserialize_with = "deserialize_lookback_days"
    )]
    pub lookback_days: u32,

    /// Delay between trace queries
    #[serde(
        default = "default_poll_interval_ms",
        deserialize_with = "deserialize_poll_interval_ms"
    )]
    pub poll_interval_ms: u64,

    /// User the scheduler runs the job as (None = submitting user)
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub run_as_user: Option<String>,

    /// Host qualifying the output/error paths handed to the scheduler
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub log_host: Option<String>,

    /// Base directory for the workspace (None = system temp dir)
    #[serde(default, deserialize_with = "deserialize_log_dir")]
    pub log_dir: Option<PathBuf>,

    /// Environment passed through to the submission command
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl SubmissionRequest {
    /// Creates a request with default settings
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            run_as_user: None,
            log_host: None,
            log_dir: None,
            env: HashMap::new(),
        }
    }

    /// Sets the lookback window; negative values fall back to the default
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = lookback_days_or_default(Some(days));
        self
    }

    /// Sets the poll interval; negative values fall back to the default
    pub fn with_poll_interval_ms(mut self, millis: i64) -> Self {
        self.poll_interval_ms = poll_interval_or_default(Some(millis));
        self
    }

    /// Sets the run-as user; an empty name means the current user
    pub fn with_run_as_user(mut self, user: impl Into<String>) -> Self {
        self.run_as_user = non_empty(user.into());
        self
    }

    /// Sets the remote log host; an empty name means the local filesystem
    pub fn with_log_host(mut self, host: impl Into<String>) -> Self {
        self.log_host = non_empty(host.into());
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.log_dir = if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir)
        };
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// True when the script body has something to run
    pub fn has_script(&self) -> bool {
        !self.script.trim().is_empty()
    }
}

/// Normalizes a lookback window, replacing absent or negative values
pub fn lookback_days_or_default(days: Option<i64>) -> u32 {
    days.and_then(|d| u32::try_from(d).ok())
        .unwrap_or(DEFAULT_LOOKBACK_DAYS)
}

/// Normalizes a poll interval, replacing absent or negative values
pub fn poll_interval_or_default(millis: Option<i64>) -> u64 {
    millis
        .and_then(|m| u64::try_from(m).ok())
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

// Deserialized requests follow the same normalization as the builders

fn deserialize_lookback_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lookback_days_or_default(Option::<i64>::deserialize(
        deserializer,
    )?))
}

fn deserialize_poll_interval_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(poll_interval_or_default(Option::<i64>::deserialize(
        deserializer,
    )?))
}

fn deserialize_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_empty))
}

fn deserialize_log_dir<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PathBuf>::deserialize(deserializer)?.filter(|dir| !dir.as_os_str().is_empty()))
}
