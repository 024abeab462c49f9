//! Process-wide tracing/logging setup for the credit engine.

pub mod tracing;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops, so tests can
/// each call it from their setup.
pub fn init() {
    tracing::init();
}
