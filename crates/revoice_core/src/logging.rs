//! Logging infrastructure.
//!
//! The library logs through the `tracing` ecosystem: commands at `debug`,
//! milestones at `info`, cleanup leftovers at `warn`. This module only
//! wires up a subscriber for binaries and tests that want one.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to the provided default directive
/// (e.g. `"info"` or `"revoice_core=debug"`). Call once at startup;
/// repeated calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();
}
