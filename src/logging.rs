//! Logging prelude: re-exports of the tracing macros used across the crate.

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO and above by default; override with `RUST_LOG`:
///
/// ```bash
/// RUST_LOG=debug mirsync sync
/// RUST_LOG=mirsync::sync=trace mirsync sync
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
