//! Test doubles for the scheduler and the poll sleep

use async_trait::async_trait;
use qrun_core::domain::job::{JobHandle, TraceSnapshot};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::SchedulerError;
use crate::repository::{CommandOutput, SchedulerRepository};
use crate::scheduler::{SleepInterrupted, Sleeper};

/// Trace text of a job that finished with the given exit status
pub fn finished_trace(job: &str, exit_code: i32) -> String {
    format!(
        "Job: {job}\n\
         \n\
         11/10/2013 12:52:40  S    enqueuing into batch, state 1 hop 1\n\
         11/10/2013 12:52:40  L    Job Run\n\
         11/10/2013 12:53:40  S    Exit_status={exit_code} resources_used.cput=00:00:00\n\
         \x20                         resources_used.walltime=00:01:00\n\
         11/10/2013 12:53:40  S    dequeuing from batch, state COMPLETE\n\
         11/10/2013 12:53:40  M    obit sent to server\n"
    )
}

/// Trace text of a job that is still queued or running
pub fn running_trace(job: &str) -> String {
    format!(
        "Job: {job}\n\
         \n\
         11/10/2013 12:52:40  S    enqueuing into batch, state 1 hop 1\n\
         11/10/2013 12:52:40  L    Job Run\n"
    )
}

pub fn trace_failure() -> SchedulerError {
    SchedulerError::Spawn {
        program: "tracejob".to_string(),
        source: std::io::Error::other("connection reset"),
    }
}

/// Scheduler that replays a scripted sequence of trace results
///
/// Panics when asked for more traces than were scripted, so a poller that
/// never terminates fails the test instead of hanging it.
pub struct ScriptedScheduler {
    submit_reply: CommandOutput,
    job_streams: Option<(String, String)>,
    traces: Mutex<VecDeque<Result<TraceSnapshot, SchedulerError>>>,
    pub submit_calls: Mutex<Vec<(Vec<String>, HashMap<String, String>)>>,
    pub trace_calls: Mutex<Vec<(JobHandle, u32)>>,
}

impl ScriptedScheduler {
    /// Accepts submissions with the given job id
    pub fn new(job_id: &str) -> Self {
        Self {
            submit_reply: CommandOutput {
                exit_code: 0,
                output: format!("{job_id}\n"),
                error: String::new(),
            },
            job_streams: None,
            traces: Mutex::new(VecDeque::new()),
            submit_calls: Mutex::new(Vec::new()),
            trace_calls: Mutex::new(Vec::new()),
        }
    }

    /// Rejects submissions with the given exit code and stderr
    pub fn rejecting(exit_code: i32, error: &str) -> Self {
        let mut scheduler = Self::new("");
        scheduler.submit_reply = CommandOutput {
            exit_code,
            output: String::new(),
            error: error.to_string(),
        };
        scheduler
    }

    /// Writes these bytes to the `-o`/`-e` paths on submission, as the job would
    pub fn with_job_streams(mut self, stdout: &str, stderr: &str) -> Self {
        self.job_streams = Some((stdout.to_string(), stderr.to_string()));
        self
    }

    pub fn then_trace(self, output: &str) -> Self {
        self.push(Ok(TraceSnapshot::new(output, "")))
    }

    pub fn then_trace_with_error(self, output: &str, error: &str) -> Self {
        self.push(Ok(TraceSnapshot::new(output, error)))
    }

    pub fn then_trace_failure(self) -> Self {
        self.push(Err(trace_failure()))
    }

    pub fn trace_count(&self) -> usize {
        self.trace_calls.lock().unwrap().len()
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.lock().unwrap().len()
    }

    fn push(self, result: Result<TraceSnapshot, SchedulerError>) -> Self {
        self.traces.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl SchedulerRepository for ScriptedScheduler {
    async fn submit(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, SchedulerError> {
        self.submit_calls
            .lock()
            .unwrap()
            .push((args.to_vec(), env.clone()));

        if let Some((stdout, stderr)) = &self.job_streams {
            for (flag, body) in [("-o", stdout), ("-e", stderr)] {
                if let Some(pos) = args.iter().position(|a| a == flag) {
                    std::fs::write(&args[pos + 1], body).unwrap();
                }
            }
        }

        Ok(self.submit_reply.clone())
    }

    async fn trace(
        &self,
        handle: &JobHandle,
        lookback_days: u32,
    ) -> Result<TraceSnapshot, SchedulerError> {
        self.trace_calls
            .lock()
            .unwrap()
            .push((handle.clone(), lookback_days));

        self.traces
            .lock()
            .unwrap()
            .pop_front()
            .expect("poller queried more traces than were scripted")
    }
}

/// Sleeper that returns immediately and records every requested duration
#[derive(Default)]
pub struct RecordingSleeper {
    interrupt_on: Vec<usize>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an interruption on the given (zero-based) sleep calls
    pub fn interrupting_on(calls: &[usize]) -> Self {
        Self {
            interrupt_on: calls.to_vec(),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        let mut sleeps = self.sleeps.lock().unwrap();
        let call = sleeps.len();
        sleeps.push(duration);

        if self.interrupt_on.contains(&call) {
            Err(SleepInterrupted)
        } else {
            Ok(())
        }
    }
}
