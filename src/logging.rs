//! `tracing` subscriber setup.
//!
//! The library only emits through `tracing` macros; installing a subscriber is
//! left to the embedding application. These helpers install a formatted
//! subscriber filtered by `RUST_LOG`, falling back to the configured directive.

use tracing_subscriber::EnvFilter;

use crate::config::ToolkitConfig;

/// Build the filter: `RUST_LOG` if set and valid, else `config.log_filter`.
pub fn env_filter(config: &ToolkitConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Install a global fmt subscriber. Returns `false` if one was already set.
pub fn try_init(config: &ToolkitConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_thread_names(true)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a global fmt subscriber, ignoring an already-installed one.
pub fn init(config: &ToolkitConfig) {
    if !try_init(config) {
        tracing::debug!("tracing subscriber already installed");
    }
}
