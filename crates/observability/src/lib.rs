//! Tracing/logging setup shared by native Stockroom binaries.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(Format::Json);
}

/// Initialize with human-readable output (interactive tools).
pub fn init_pretty() {
    tracing::init(Format::Pretty);
}

pub use self::tracing::Format;

/// Tracing configuration (filters, layers).
pub mod tracing;
