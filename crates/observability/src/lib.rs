//! Tracing/logging setup shared by every process that embeds the invoicing
//! core.

/// Initialize process-wide tracing with the `info` default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Initialize tracing, using `default_filter` when `RUST_LOG` is unset.
///
/// Pass `InvoicingConfig::log_filter` here to honour `JOBLEDGER_LOG`.
pub fn init_with_default(default_filter: &str) {
    tracing::init(default_filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
