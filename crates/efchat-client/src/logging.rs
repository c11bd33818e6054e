//! Logging setup for bridge binaries.
//!
//! The bridge itself only emits `tracing` events; hosts that want a quick
//! subscriber can call [`init`] instead of wiring one up themselves.

use tracing_subscriber::EnvFilter;

/// Initializes a compact stdout subscriber.
///
/// `RUST_LOG` overrides `default_directive` when set. Safe to call more
/// than once; later calls are no-ops.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .try_init();
}
