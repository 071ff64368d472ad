//! # Khidma Support
//!
//! Shared utilities for the Khidma DI crates.
//!
//! This crate provides:
//! - Text rendering for diagnostics and error messages
//! - `tracing` subscriber setup for binaries and tests

pub mod logging;
pub mod rendering;
