//! Watcher and scanner errors.

use thiserror::Error;

/// Result type alias for watching and scanning.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Failures while scanning or watching the source directory.
///
/// All of these happen at startup; per-file problems never surface here.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The source directory does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// A configured directory path points at something else.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// `start` called on a running watcher.
    #[error("already watching {0}")]
    AlreadyWatching(String),

    /// The notification backend refused the watch.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Listing the directory or creating the target failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
