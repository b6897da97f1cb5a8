//! Scheduler layer for the runner
//!
//! This layer tracks a submitted job through the scheduler's trace log until
//! it is terminal. It owns the polling state machine and the wait between
//! polls.

pub mod poller;
pub mod sleeper;

pub use poller::CompletionPoller;
pub use sleeper::{SleepInterrupted, Sleeper, TokioSleeper};
