//! Qrun Core
//!
//! Core types for the qrun batch submission system.
//!
//! This crate contains the domain types shared by the runner engine and the
//! command-line front end: submission requests, scheduler job handles, trace
//! snapshots, derived job states and job log entries. It performs no I/O.

pub mod domain;
