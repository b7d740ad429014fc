//! Structured logging configuration.
//!
//! Thin wrapper around `tracing-subscriber` so binaries embedding the channel
//! layer get consistent, env-filterable output.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with the `RUST_LOG` filter, defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_default("info");
}

/// Initialize logging with a custom default filter directive.
pub fn init_with_default(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = fmt().with_env_filter(filter).try_init();
}
