//! Error types for the daemon.

use std::path::PathBuf;

use marca_directory_watcher::WatcherError;
use marca_media::MediaError;
use thiserror::Error;

/// Result type alias for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors that stop the daemon or reject a submission.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Invalid or incomplete configuration. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("failed to parse {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Media error outside a job, e.g. while loading the watermark.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Watcher error.
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    /// Job submitted after shutdown began.
    #[error("dispatcher is shut down")]
    DispatcherClosed,

    /// A blocking startup task panicked or was cancelled.
    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
