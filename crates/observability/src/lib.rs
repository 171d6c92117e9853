//! Tracing and logging (shared setup for the server and the CLI).

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging for a service: JSON lines, `RUST_LOG`
/// filter with an `info` default.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json, "info");
}

/// Initialize logging for an interactive tool: compact lines on stderr,
/// `warn` unless `RUST_LOG` says otherwise.
pub fn init_cli() {
    tracing::init(LogFormat::Compact, "warn");
}
