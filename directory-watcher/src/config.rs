//! Configuration for watching the source directory.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Path to the directory. Only its direct children are watched.
    pub path: PathBuf,

    /// Quiet period per path before an event is forwarded, in milliseconds.
    /// 0 forwards every event immediately.
    pub debounce_ms: u64,
}

impl WatchConfig {
    /// Create a new watch config with debouncing off.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce_ms: 0,
        }
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The debounce window, if enabled.
    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then_some(Duration::from_millis(self.debounce_ms))
    }
}
