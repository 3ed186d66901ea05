//! Toolkit configuration.

use std::time::Duration;

/// Configuration for a [`Toolkit`](crate::toolkit::Toolkit).
#[derive(Debug, Clone)]
pub struct ToolkitConfig {
    /// Name given to the spawned dispatch thread.
    pub thread_name: String,
    /// Default `tracing` filter directive used by [`logging::init`](crate::logging::init)
    /// when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Deliveries slower than this are reported with `tracing::warn!`.
    pub slow_dispatch: Option<Duration>,
    /// Whether queued paint events for the same component are merged.
    pub coalesce_paint: bool,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            thread_name: "toolkit-dispatch".to_owned(),
            log_filter: "toolkit_core=info".to_owned(),
            slow_dispatch: Some(Duration::from_millis(250)),
            coalesce_paint: false,
        }
    }
}

impl ToolkitConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch thread name (builder).
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the default log filter directive (builder).
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Set or disable the slow-dispatch warning threshold (builder).
    pub fn with_slow_dispatch(mut self, threshold: Option<Duration>) -> Self {
        self.slow_dispatch = threshold;
        self
    }

    /// Enable or disable paint coalescing (builder).
    pub fn with_paint_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_paint = enabled;
        self
    }
}
