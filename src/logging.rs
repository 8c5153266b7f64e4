//! Log subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured filter. Output goes to
//! stderr because stdout carries the RPC protocol.

use tracing_subscriber::EnvFilter;

use crate::types::settings::LoggingSettings;

/// Installs the global `fmt` subscriber. Returns `false` if one was already set.
pub fn init(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
