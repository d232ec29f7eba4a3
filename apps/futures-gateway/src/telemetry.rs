//! Tracing setup.
//!
//! Console subscriber with an environment filter; `RUST_LOG` controls the
//! level (default: `info`).

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}
