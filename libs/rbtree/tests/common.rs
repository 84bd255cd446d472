#![allow(unused, reason = "not used by all tests")]

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes through the test harness, so events only show up
/// for failing tests. Safe to call from every test, only the first call has an effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
