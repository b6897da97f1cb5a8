//! Verdict
//!
//! Maps the scheduler's terminal state onto pass/fail.

use qrun_core::domain::job::JobState;

/// True iff the exit status reported by the scheduler is zero
pub fn exit_code_success(exit_code: i32) -> bool {
    exit_code == 0
}

/// Pass/fail for a job state
///
/// Only `Terminal` with exit status 0 passes. `NotFound` fails regardless of
/// anything else, and `Pending` is never a pass.
pub fn verdict(state: &JobState) -> bool {
    match state {
        JobState::Terminal { exit_code, .. } => exit_code_success(*exit_code),
        JobState::NotFound | JobState::Pending => false,
    }
}
