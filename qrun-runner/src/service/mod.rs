//! Service layer
//!
//! Services contain the business logic of a submission. They stage and
//! submit the script, relay the job's output and decide the verdict, using
//! the repository layer for everything that touches the scheduler.

pub mod collector;
mod log_buffer;
mod submission;
pub mod verdict;

// Re-export traits
pub use log_buffer::LogSink;

// Re-export implementations
pub use collector::CollectedOutput;
pub use log_buffer::InMemoryLogBuffer;
pub use submission::{JobSubmitter, build_submit_args, parse_job_id};
