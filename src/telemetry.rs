//! Tracing setup for binaries and tests.
//!
//! The pipeline instruments itself with `tracing`; this module wires a
//! subscriber so those spans and events land somewhere useful. Library
//! consumers with their own subscriber should skip this and keep theirs.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a fmt subscriber honoring `RUST_LOG`, defaulting to `info`.
///
/// Idempotent: a second call (or a subscriber installed by the host
/// application) wins silently.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
