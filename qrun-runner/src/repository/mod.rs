//! Repository layer
//!
//! Repositories are stateless clients that abstract communication with the
//! external batch scheduler. They run its commands and hand back raw output
//! without interpreting it.
//!
//! All repositories are trait-based to enable testing and mocking.

mod scheduler;

// Re-export traits
pub use scheduler::SchedulerRepository;

// Re-export implementations
pub use scheduler::{CommandOutput, PbsCommandRepository};
