//! Tracing subscriber configuration.
//!
//! JSON-formatted structured logs, filtered via `RUST_LOG` (defaulting to
//! `info`). The payment recorder emits its audit lines through this.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. No-op if one is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
