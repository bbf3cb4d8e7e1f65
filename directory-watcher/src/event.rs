//! Media file events, from notify or from the startup scan.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use marca_media::{MediaKind, classify};
use notify::EventKind;
use notify::event::{CreateKind, ModifyKind};
use serde::{Deserialize, Serialize};

/// A change to a media file in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// The kind of change.
    pub kind: FileEventKind,

    /// Path to the affected file.
    pub path: PathBuf,

    /// What the file was classified as when the event arrived.
    pub media_kind: MediaKind,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event, classifying `path`.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            kind,
            media_kind: classify(&path),
            path,
            timestamp: Utc::now(),
        }
    }

    /// Turn a raw notify event into file events for direct children of `root`.
    ///
    /// Drops everything but creations and content or metadata modifications,
    /// directories, paths outside `root` and non-media files.
    pub fn from_notify(event: notify::Event, root: &Path) -> Vec<Self> {
        let Some(kind) = FileEventKind::from_notify(&event.kind) else {
            return Vec::new();
        };

        event
            .paths
            .into_iter()
            .filter(|path| path.parent() == Some(root))
            .filter(|path| !path.is_dir())
            .map(|path| Self::new(kind, path))
            .filter(|e| e.media_kind.is_media())
            .collect()
    }
}

/// Kind of file event. Both kinds lead to the same processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File was created.
    Created,

    /// File was modified.
    Modified,

    /// File already existed when the daemon started.
    Existing,
}

impl FileEventKind {
    /// Map a notify event kind, or `None` if it should not trigger processing.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(CreateKind::Folder) => None,
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            _ => None,
        }
    }
}
