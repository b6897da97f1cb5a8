//! Core domain types
//!
//! This module contains the core domain structures used across qrun crates.
//! The runner builds and consumes them while driving a submission; the CLI
//! renders them.

pub mod job;
pub mod log;
pub mod request;
