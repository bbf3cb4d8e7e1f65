//! One-shot listing of media files already present at startup.

use std::path::PathBuf;
use std::time::Instant;

use marca_media::MediaKind;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WatcherError};
use crate::event::{FileEvent, FileEventKind};
use crate::watcher::existing_dir;

/// Lists the source directory once so existing files get processed.
#[derive(Debug, Clone)]
pub struct BootstrapScanner {
    source_dir: PathBuf,
    target_dir: PathBuf,
}

impl BootstrapScanner {
    /// Create a scanner for `source_dir` writing into `target_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
        }
    }

    /// Prepare the target directory and list the media files in the source.
    ///
    /// Fails if the source directory does not exist. The target directory is
    /// created if needed. Only direct children are listed, in directory order.
    pub fn scan(&self) -> Result<ScanResult> {
        let start = Instant::now();
        let source = existing_dir(&self.source_dir)?;

        std::fs::create_dir_all(&self.target_dir)?;
        if !self.target_dir.is_dir() {
            return Err(WatcherError::NotADirectory(
                self.target_dir.display().to_string(),
            ));
        }

        let mut events = Vec::new();
        let mut ignored = 0;

        let walker = WalkDir::new(&source)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let event = FileEvent::new(FileEventKind::Existing, entry.path());
            if event.media_kind == MediaKind::Ignored {
                debug!("Ignoring {}", entry.path().display());
                ignored += 1;
                continue;
            }
            events.push(event);
        }

        let duration = start.elapsed();
        info!(
            "Found {} media files in {} in {:?} ({} ignored)",
            events.len(),
            source.display(),
            duration,
            ignored
        );

        Ok(ScanResult {
            events,
            ignored,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

/// Result of a startup scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// One event per media file found.
    pub events: Vec<FileEvent>,

    /// Number of regular files skipped as non-media.
    pub ignored: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}
