//! Derive and attribute macros for Khidma DI.

pub use khidma_macros::{Injectable, service};
