//! SAFEBET — safe-odds combo engine for daily football picks.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod feed;
pub mod pipeline;
pub mod types;
