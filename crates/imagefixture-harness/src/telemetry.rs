//! Log output for test binaries.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber that writes through the test harness's
/// captured output, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call from every test; only the first call in a process installs
/// the subscriber.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
