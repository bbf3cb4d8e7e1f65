//! Per-path coalescing of rapid file events.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::event::FileEvent;

/// Holds events until their path has been quiet for the window.
///
/// A newer event for a pending path replaces the older one and restarts its
/// window, so a burst of create/modify notifications becomes one event.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, (FileEvent, Instant)>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record an event seen at `now`. Returns true if it replaced a pending one.
    pub fn push(&mut self, event: FileEvent, now: Instant) -> bool {
        self.pending
            .insert(event.path.clone(), (event, now + self.window))
            .is_some()
    }

    /// Remove and return the events whose window has elapsed by `now`.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<FileEvent> {
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, due))| *due <= now)
            .map(|(path, _)| path.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|(event, _)| event))
            .collect()
    }

    /// Remove and return everything still pending.
    pub fn drain_all(&mut self) -> Vec<FileEvent> {
        self.pending.drain().map(|(_, (event, _))| event).collect()
    }

    /// Earliest time a pending event becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, due)| *due).min()
    }

    /// Number of paths waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FileEventKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_burst_collapses_to_latest() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        assert!(!debouncer.push(FileEvent::new(FileEventKind::Created, "/in/a.png"), start));
        assert!(debouncer.push(
            FileEvent::new(FileEventKind::Modified, "/in/a.png"),
            start + Duration::from_millis(50)
        ));
        debouncer.push(FileEvent::new(FileEventKind::Created, "/in/b.mp4"), start);
        assert_eq!(debouncer.len(), 2);

        // b is due, a was pushed back by its second event
        let ready = debouncer.drain_ready(start + Duration::from_millis(100));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].path, PathBuf::from("/in/b.mp4"));

        let ready = debouncer.drain_ready(start + Duration::from_millis(150));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].kind, FileEventKind::Modified);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_next_deadline_and_drain_all() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        assert_eq!(debouncer.next_deadline(), None);

        debouncer.push(FileEvent::new(FileEventKind::Created, "/in/a.png"), start);
        debouncer.push(
            FileEvent::new(FileEventKind::Created, "/in/b.png"),
            start + Duration::from_millis(5),
        );
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(10))
        );

        assert_eq!(debouncer.drain_all().len(), 2);
        assert!(debouncer.is_empty());
    }
}
