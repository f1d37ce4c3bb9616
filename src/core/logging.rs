//! Logging setup
//!
//! Both halves of the crate log through `tracing` with fixed targets:
//! `bindgen` for code generation and `scripting` for the script host.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level from the configuration is used.
/// Calling this more than once is harmless.
pub fn initialize_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
    tracing::debug!(target: "bindgen", "Logging initialized at {}", config.level.as_filter());
}
