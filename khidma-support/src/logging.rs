//! Subscriber setup for hosts and tests.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when the variable is unset or invalid.
///
/// Safe to call more than once: later calls are ignored, which keeps
/// test binaries with many `#[test]` functions quiet.
///
/// ```
/// khidma_support::logging::init_tracing("khidma=debug");
/// khidma_support::logging::init_tracing("khidma=trace"); // no-op
/// ```
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
