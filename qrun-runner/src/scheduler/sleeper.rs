//! Sleep abstraction for the completion poller
//!
//! The scheduler offers no completion notification, so the poller waits a
//! fixed interval between trace queries. The wait goes through this trait so
//! tests can run many polls without real time passing.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// The sleep ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sleep interrupted")]
pub struct SleepInterrupted;

/// Waits between polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted>;
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        tokio::time::sleep(duration).await;
        Ok(())
    }
}
