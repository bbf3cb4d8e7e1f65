//! Error types for media processing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors that can occur while watermarking a single file.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The source file vanished before it could be opened.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The source (or the watermark asset) could not be decoded.
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Writing or transcoding the output failed.
    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Not an image or video this system handles.
    #[error("not a supported media file: {0}")]
    Ignored(PathBuf),

    /// Scale fraction outside (0, 1].
    #[error("invalid scale fraction {value} for {name}: must be in (0, 1]")]
    InvalidScale { name: &'static str, value: f64 },

    /// FFmpeg not found on PATH.
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    /// FFprobe not found on PATH.
    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a decode error.
    pub fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an encode error.
    pub fn encode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Encode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is confined to one job.
    ///
    /// Skippable errors are logged and the run continues; the rest point at
    /// a broken setup (bad config, missing tooling).
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Decode { .. }
                | Self::Encode { .. }
                | Self::Ignored(_)
                | Self::Io(_)
        )
    }
}
