//! Process-wide tracing setup shared by binaries and tests.

/// Initialize JSON tracing with `RUST_LOG` filtering (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
