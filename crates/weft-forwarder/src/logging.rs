//! Tracing subscriber bootstrap for hosts embedding the engine.
//!
//! Level conventions on the data path:
//! - ERROR: misconfiguration (e.g. fault reports with no faulter)
//! - WARN: recoverable loss (dropped fault reports, dropped trace events)
//! - INFO: session lifecycle (routes installed, sessions reaped)
//! - DEBUG: per-payload forwarding detail

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the given default filter,
/// overridable via `RUST_LOG`.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize with the `info` default.
pub fn init() {
    init_with_filter("info");
}

/// Initialize with JSON output for containerized hosts.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Initialize for tests. Safe to call from every test; repeat calls are
/// ignored.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
