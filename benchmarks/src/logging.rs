//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set and valid, otherwise `default_directive`.
pub fn build_env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a stderr formatter. A second call is a no-op.
pub fn init_logging(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(default_directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
