//! Process-wide tracing setup for the taxonomy binaries.

pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, LogFormat};

/// Initialize tracing with the default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(DEFAULT_FILTER);
}
