//! Tracing subscriber initialisation for the headless client.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

/// Install a JSON subscriber filtered by `RUST_LOG` (default `info`).
///
/// Installing twice is harmless: the second attempt logs a warning and the
/// existing subscriber stays in place.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}
