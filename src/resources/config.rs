//! Engine configuration.

use std::time::Duration;

/// Quiet period before a scheduled validation pass runs.
pub const DEFAULT_VALIDATION_DELAY: Duration = Duration::from_millis(400);

/// Tunables of a [`NedResources`](super::NedResources) instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcesConfig {
    /// Debounce delay of background validation; `None` disables the
    /// background worker (call `validate_all_files` explicitly).
    pub validation_delay: Option<Duration>,
    /// Log timing and size statistics of rehash and validation passes.
    pub debug_stats: bool,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            validation_delay: Some(DEFAULT_VALIDATION_DELAY),
            debug_stats: false,
        }
    }
}

impl ResourcesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration without a background validation worker.
    pub fn manual() -> Self {
        Self {
            validation_delay: None,
            ..Self::default()
        }
    }

    pub fn with_validation_delay(mut self, delay: Option<Duration>) -> Self {
        self.validation_delay = delay;
        self
    }

    pub fn with_debug_stats(mut self, enabled: bool) -> Self {
        self.debug_stats = enabled;
        self
    }
}
