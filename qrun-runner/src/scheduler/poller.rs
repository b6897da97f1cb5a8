//! Completion poller
//!
//! Polls the scheduler's trace log for a submitted job until it reaches a
//! terminal state. The log is written incrementally and asynchronously, so
//! every poll re-reads the whole lookback window and the exit-status line may
//! show up one or more polls after the dequeue line.
//!
//! States:
//! - START: initial query. Blank output means the scheduler has no record of
//!   the job; that is final (`NotFound`) and is not retried.
//! - QUERY: the snapshot is matched for a dequeue marker plus an
//!   `Exit_status=<n>` marker. Both present ends the loop (`Terminal`);
//!   anything less is `Pending` and is polled again after the interval.
//!
//! A failed query or an interrupted sleep is logged and polling continues. The
//! first failed query is also reported to the job log.
//! There is no deadline: a job that never reaches a terminal marker is polled
//! for as long as the owning task lives.

use qrun_core::domain::job::{JobHandle, JobState, TraceSnapshot};
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::repository::SchedulerRepository;
use crate::scheduler::sleeper::Sleeper;
use crate::service::LogSink;

/// "dequeuing from <queue>, state <STATE>": the job left the system
const DEQUEUE_PATTERN: &str = r"(?m)dequeuing\b.*, state (\S+)";

const EXIT_STATUS_PATTERN: &str = r"Exit_status=(-?\d+)";

/// Drives one job from submission to a terminal state
pub struct CompletionPoller {
    scheduler: Arc<dyn SchedulerRepository>,
    sleeper: Arc<dyn Sleeper>,
    dequeue: Regex,
    exit_status: Regex,
}

impl CompletionPoller {
    /// Creates a new completion poller
    ///
    /// # Arguments
    /// * `scheduler` - Repository used for trace queries
    /// * `sleeper` - Waits between queries
    pub fn new(scheduler: Arc<dyn SchedulerRepository>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            scheduler,
            sleeper,
            dequeue: Regex::new(DEQUEUE_PATTERN).expect("dequeue pattern is valid"),
            exit_status: Regex::new(EXIT_STATUS_PATTERN).expect("exit status pattern is valid"),
        }
    }

    /// Derives the job state from one trace snapshot
    ///
    /// Never returns `NotFound`; blank output only means "not found" on the
    /// initial query and is handled by `wait_for_completion`.
    pub fn classify(&self, snapshot: &TraceSnapshot) -> JobState {
        let Some(dequeued) = self.dequeue.captures(&snapshot.output) else {
            return JobState::Pending;
        };

        // The accounting record repeats Exit_status; the latest one wins
        let exit_code = self
            .exit_status
            .captures_iter(&snapshot.output)
            .filter_map(|c| c[1].parse::<i32>().ok())
            .last();

        match exit_code {
            Some(exit_code) => JobState::Terminal {
                exit_code,
                state: dequeued[1].to_string(),
            },
            None => {
                debug!("Dequeue marker found but no exit status yet");
                JobState::Pending
            }
        }
    }

    /// Polls until the job is terminal or known to be missing
    ///
    /// # Arguments
    /// * `handle` - Job identifier to trace
    /// * `lookback_days` - Days of accounting history per query
    /// * `interval` - Wait between queries
    /// * `log` - Job log receiving progress messages
    ///
    /// # Returns
    /// `JobState::NotFound` or `JobState::Terminal`
    pub async fn wait_for_completion(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
        interval: Duration,
        log: &dyn LogSink,
    ) -> JobState {
        info!(
            "Waiting for job {} (lookback: {} day(s), interval: {:?})",
            handle, lookback_days, interval
        );

        let mut failure_reported = false;

        // START
        let mut snapshot = loop {
            match self.query(handle, lookback_days, log, &mut failure_reported).await {
                Some(snapshot) => break snapshot,
                None => self.pause(interval).await,
            }
        };

        if snapshot.is_blank() {
            info!("Job {} not found in trace log", handle);
            log.warning(format!(
                "Could not find job {} in PBS logs...Marking build as UNSTABLE",
                handle
            ));
            let error = snapshot.error.trim();
            if !error.is_empty() {
                log.warning(error.to_string());
            }
            return JobState::NotFound;
        }

        log.info("Seeking job end...".to_string());

        // QUERY
        let mut polls: u64 = 1;
        loop {
            let state = self.classify(&snapshot);
            if let JobState::Terminal { exit_code, state: name } = &state {
                info!(
                    "Job {} terminal after {} poll(s): state {}, exit status {}",
                    handle, polls, name, exit_code
                );
                log.info(format!(
                    "Found job state {} (Exit_status={})",
                    name, exit_code
                ));
                return state;
            }

            self.pause(interval).await;
            polls += 1;

            debug!("Polling job {} (poll #{})", handle, polls);
            if let Some(next) = self
                .query(handle, lookback_days, log, &mut failure_reported)
                .await
            {
                snapshot = next;
            }
        }
    }

    /// Runs one trace query; failures are logged and yield None
    async fn query(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
        log: &dyn LogSink,
        failure_reported: &mut bool,
    ) -> Option<TraceSnapshot> {
        match self.scheduler.trace(handle, lookback_days).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Trace query for job {} failed: {}", handle, e);
                if !*failure_reported {
                    log.warning(format!(
                        "Trace query for job {} failed, retrying: {}",
                        handle, e
                    ));
                    *failure_reported = true;
                }
                None
            }
        }
    }

    async fn pause(&self, interval: Duration) {
        if let Err(e) = self.sleeper.sleep(interval).await {
            warn!("Poll wait {}, continuing", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::InMemoryLogBuffer;
    use crate::testing::{RecordingSleeper, ScriptedScheduler, finished_trace, running_trace};

    const INTERVAL: Duration = Duration::from_millis(300);

    fn poller(
        scheduler: &Arc<ScriptedScheduler>,
        sleeper: &Arc<RecordingSleeper>,
    ) -> CompletionPoller {
        CompletionPoller::new(scheduler.clone(), sleeper.clone())
    }

    fn idle_poller() -> CompletionPoller {
        CompletionPoller::new(
            Arc::new(ScriptedScheduler::new("1.host")),
            Arc::new(RecordingSleeper::new()),
        )
    }

    fn snapshot(output: &str) -> TraceSnapshot {
        TraceSnapshot::new(output, "")
    }

    #[test]
    fn test_classify_complete_success() {
        let state = idle_poller().classify(&snapshot(&finished_trace("128.localhost", 0)));
        assert_eq!(
            state,
            JobState::Terminal {
                exit_code: 0,
                state: "COMPLETE".to_string()
            }
        );
    }

    #[test]
    fn test_classify_complete_failure() {
        let state = idle_poller().classify(&snapshot(&finished_trace("128.localhost", 1)));
        assert_eq!(
            state,
            JobState::Terminal {
                exit_code: 1,
                state: "COMPLETE".to_string()
            }
        );
    }

    #[test]
    fn test_classify_without_dequeue_is_pending() {
        let poller = idle_poller();
        assert_eq!(
            poller.classify(&snapshot(&running_trace("7.host"))),
            JobState::Pending
        );
        // Exit status alone is not enough
        assert_eq!(
            poller.classify(&snapshot("12:53:40  S    Exit_status=0\n")),
            JobState::Pending
        );
    }

    #[test]
    fn test_classify_dequeue_without_exit_status_is_pending() {
        let output = "11/10/2013 12:53:40  S    dequeuing from batch, state COMPLETE\n";
        assert_eq!(idle_poller().classify(&snapshot(output)), JobState::Pending);
    }

    #[test]
    fn test_classify_uses_latest_exit_status() {
        let output = "12:00:00  S    Exit_status=0\n\
                      12:05:00  S    Exit_status=-11\n\
                      12:05:00  S    dequeuing from workq, state EXITING\n";
        assert_eq!(
            idle_poller().classify(&snapshot(output)),
            JobState::Terminal {
                exit_code: -11,
                state: "EXITING".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_initial_trace_is_not_found_without_polling() {
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace_with_error("  \n", "tracejob: Couldn't find job 42.host\n"),
        );
        let sleeper = Arc::new(RecordingSleeper::new());
        let log = InMemoryLogBuffer::new();

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(&JobHandle::new("42.host"), 1, INTERVAL, &log)
            .await;

        assert_eq!(state, JobState::NotFound);
        assert_eq!(scheduler.trace_count(), 1);
        assert!(sleeper.recorded().is_empty());
        let messages = log.messages();
        assert!(messages[0].contains("Could not find job 42.host"));
        assert_eq!(messages[1], "tracejob: Couldn't find job 42.host");
    }

    #[tokio::test]
    async fn test_terminal_on_first_query() {
        let scheduler =
            Arc::new(ScriptedScheduler::new("42.host").then_trace(&finished_trace("42.host", 0)));
        let sleeper = Arc::new(RecordingSleeper::new());
        let log = InMemoryLogBuffer::new();

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(&JobHandle::new("42.host"), 1, INTERVAL, &log)
            .await;

        assert!(matches!(state, JobState::Terminal { exit_code: 0, .. }));
        assert_eq!(scheduler.trace_count(), 1);
        assert!(sleeper.recorded().is_empty());
        assert!(
            log.messages()
                .contains(&"Found job state COMPLETE (Exit_status=0)".to_string())
        );
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace(&running_trace("42.host"))
                .then_trace(&running_trace("42.host"))
                .then_trace(&running_trace("42.host"))
                .then_trace(&running_trace("42.host"))
                .then_trace(&finished_trace("42.host", 0)),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(
                &JobHandle::new("42.host"),
                3,
                INTERVAL,
                &InMemoryLogBuffer::new(),
            )
            .await;

        assert!(matches!(state, JobState::Terminal { exit_code: 0, .. }));
        assert_eq!(scheduler.trace_count(), 5);
        assert_eq!(sleeper.recorded(), vec![INTERVAL; 4]);

        // Every query uses the same handle and lookback window
        for (handle, days) in scheduler.trace_calls.lock().unwrap().iter() {
            assert_eq!(handle.as_str(), "42.host");
            assert_eq!(*days, 3);
        }
    }

    #[tokio::test]
    async fn test_exit_status_lagging_dequeue_keeps_polling() {
        let dequeued_only = "Job: 42.host\n\
                             12:53:40  S    dequeuing from batch, state COMPLETE\n";
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace(dequeued_only)
                .then_trace(dequeued_only)
                .then_trace(&finished_trace("42.host", 2)),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(
                &JobHandle::new("42.host"),
                1,
                INTERVAL,
                &InMemoryLogBuffer::new(),
            )
            .await;

        assert!(matches!(state, JobState::Terminal { exit_code: 2, .. }));
        assert_eq!(scheduler.trace_count(), 3);
    }

    #[tokio::test]
    async fn test_blank_trace_after_start_is_pending() {
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace(&running_trace("42.host"))
                .then_trace("")
                .then_trace(&finished_trace("42.host", 0)),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(
                &JobHandle::new("42.host"),
                1,
                INTERVAL,
                &InMemoryLogBuffer::new(),
            )
            .await;

        assert!(matches!(state, JobState::Terminal { .. }));
        assert_eq!(scheduler.trace_count(), 3);
    }

    #[tokio::test]
    async fn test_query_failures_are_retried() {
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace_failure()
                .then_trace(&running_trace("42.host"))
                .then_trace_failure()
                .then_trace(&finished_trace("42.host", 1)),
        );
        let sleeper = Arc::new(RecordingSleeper::new());
        let log = InMemoryLogBuffer::new();

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(&JobHandle::new("42.host"), 1, INTERVAL, &log)
            .await;

        assert!(matches!(state, JobState::Terminal { exit_code: 1, .. }));
        assert_eq!(scheduler.trace_count(), 4);
        assert_eq!(sleeper.recorded().len(), 3);

        // Only the first failure reaches the job log
        let failures: Vec<String> = log
            .messages()
            .into_iter()
            .filter(|m| m.starts_with("Trace query for job 42.host failed"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("connection reset"));
        assert_eq!(log.messages()[0], failures[0]);
    }

    #[tokio::test]
    async fn test_interrupted_sleep_does_not_stop_polling() {
        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace(&running_trace("42.host"))
                .then_trace(&running_trace("42.host"))
                .then_trace(&finished_trace("42.host", 0)),
        );
        let sleeper = Arc::new(RecordingSleeper::interrupting_on(&[0, 1]));

        let state = poller(&scheduler, &sleeper)
            .wait_for_completion(
                &JobHandle::new("42.host"),
                1,
                INTERVAL,
                &InMemoryLogBuffer::new(),
            )
            .await;

        assert!(matches!(state, JobState::Terminal { exit_code: 0, .. }));
        assert_eq!(scheduler.trace_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_sleeper_spaces_queries_by_interval() {
        use crate::scheduler::TokioSleeper;

        let scheduler = Arc::new(
            ScriptedScheduler::new("42.host")
                .then_trace(&running_trace("42.host"))
                .then_trace(&running_trace("42.host"))
                .then_trace(&finished_trace("42.host", 0)),
        );
        let poller = CompletionPoller::new(scheduler.clone(), Arc::new(TokioSleeper));

        let start = tokio::time::Instant::now();
        poller
            .wait_for_completion(
                &JobHandle::new("42.host"),
                1,
                INTERVAL,
                &InMemoryLogBuffer::new(),
            )
            .await;

        assert_eq!(scheduler.trace_count(), 3);
        assert!(start.elapsed() >= INTERVAL * 2);
    }
}
