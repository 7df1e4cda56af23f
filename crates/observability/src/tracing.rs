//! Tracing/logging initialization.
//!
//! The posting engine flags data anomalies (multiple active academic years,
//! concurrent transitions) through `tracing::warn!`; this is the sink that
//! makes those visible.

use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is unset: info everywhere, debug for
/// the engine's own crates so bundle commits, allocations, and reconciliation
/// runs are visible in dev.
const DEFAULT_DIRECTIVES: &str = "info,\
    campusledger_store=debug,\
    campusledger_posting=debug,\
    campusledger_registry=debug,\
    campusledger_wallet=debug";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
