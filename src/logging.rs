//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Diff report ready");
//! warn!("diff is not current");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `default_level` is used when `RUST_LOG` is not set:
///
/// ```bash
/// RUST_LOG=debug filesync run -s src -d dst --create true
/// RUST_LOG=filesync::executor=debug filesync watch -s src -d dst
/// ```
pub fn init_tracing(default_level: &str) {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

/// Log an I/O failure either as an error or, when `to_debug` is set, as debug noise.
pub fn log_failure(to_debug: bool, message: &str) {
	if to_debug {
		debug!("{}", message);
	} else {
		error!("{}", message);
	}
}

// vim: ts=4
