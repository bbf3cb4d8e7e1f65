//! A unit of work: one source file to watermark.

use std::path::PathBuf;
use std::time::Instant;

use marca_directory_watcher::{FileEvent, FileEventKind};
use marca_media::{MediaKind, classify};

/// One source file waiting to be watermarked.
#[derive(Debug, Clone)]
pub struct Job {
    /// File to process.
    pub source_path: PathBuf,

    /// Classification at enqueue time.
    pub media_kind: MediaKind,

    /// What produced the job.
    pub trigger: FileEventKind,

    /// When the job was created.
    pub enqueued_at: Instant,
}

impl Job {
    /// Create a job, or `None` if the path is not media.
    pub fn new(source_path: impl Into<PathBuf>, trigger: FileEventKind) -> Option<Self> {
        let source_path = source_path.into();
        let media_kind = classify(&source_path);
        media_kind.is_media().then(|| Self {
            source_path,
            media_kind,
            trigger,
            enqueued_at: Instant::now(),
        })
    }

    /// Create a job from a watcher or scanner event.
    pub fn from_event(event: &FileEvent) -> Option<Self> {
        Self::new(event.path.clone(), event.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_job_for_media() {
        let job = Job::new("/in/clip.MP4", FileEventKind::Created).unwrap();
        assert_eq!(job.media_kind, MediaKind::Video);
        assert_eq!(job.trigger, FileEventKind::Created);
    }

    #[test]
    fn test_no_job_for_other_files() {
        assert!(Job::new("/in/readme.md", FileEventKind::Modified).is_none());
    }

    #[test]
    fn test_job_from_event() {
        let event = FileEvent::new(FileEventKind::Existing, "/in/a.jpeg");
        let job = Job::from_event(&event).unwrap();
        assert_eq!(job.source_path, PathBuf::from("/in/a.jpeg"));
        assert_eq!(job.media_kind, MediaKind::Image);
    }
}
