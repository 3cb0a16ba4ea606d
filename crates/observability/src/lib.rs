//! Tracing/logging setup shared by binaries, harnesses, and tests.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize process-wide observability (tracing/logging).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize tracing for test runs: human-readable output captured per test.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_for_tests() {
    tracing::init_for_tests();
}
