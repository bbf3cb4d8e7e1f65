//! Live, non-recursive watching of the source directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::debounce::Debouncer;
use crate::error::{Result, WatcherError};
use crate::event::FileEvent;

/// Watches one directory, non-recursively, for new and changed media files.
///
/// The notify callback runs on the backend's own thread and only classifies
/// and enqueues; consumers read from the receiver returned by
/// [`DirectoryWatcher::start`].
pub struct DirectoryWatcher {
    /// Configuration.
    config: WatchConfig,

    /// Canonical path being watched, once started.
    root: Option<PathBuf>,

    /// Internal notify watcher.
    watcher: Option<RecommendedWatcher>,

    /// Debounce task, when a window is configured.
    forwarder: Option<JoinHandle<()>>,
}

impl DirectoryWatcher {
    /// Create a new directory watcher.
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            root: None,
            watcher: None,
            forwarder: None,
        }
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// The returned channel closes once [`DirectoryWatcher::stop`] has
    /// completed and every pending event was delivered.
    pub fn start(&mut self) -> Result<mpsc::UnboundedReceiver<FileEvent>> {
        if self.watcher.is_some() {
            return Err(WatcherError::AlreadyWatching(
                self.config.path.display().to_string(),
            ));
        }

        let root = existing_dir(&self.config.path)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let sink = match self.config.debounce() {
            None => event_tx,
            Some(window) => {
                let (raw_tx, raw_rx) = mpsc::unbounded_channel();
                self.forwarder = Some(tokio::spawn(debounce_events(raw_rx, event_tx, window)));
                raw_tx
            }
        };

        let callback_root = root.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for file_event in FileEvent::from_notify(event, &callback_root) {
                        debug!(
                            kind = ?file_event.kind,
                            "File event: {}",
                            file_event.path.display()
                        );
                        if sink.send(file_event).is_err() {
                            debug!("Event receiver dropped, discarding event");
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        watcher.watch(&root, RecursiveMode::NonRecursive)?;
        info!("Watching {} (non-recursive)", root.display());

        self.watcher = Some(watcher);
        self.root = Some(root);
        Ok(event_rx)
    }

    /// Stop watching and wait for pending debounced events to be flushed.
    pub async fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Some(ref root) = self.root {
                let _ = watcher.unwatch(root);
            }
        }

        if let Some(forwarder) = self.forwarder.take() {
            if let Err(e) = forwarder.await {
                warn!("Debounce task ended abnormally: {e}");
            }
        }

        info!("Directory watcher stopped");
    }

    /// Check if the watcher is running.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }
}

/// Canonicalize `path`, requiring an existing directory.
pub(crate) fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(WatcherError::DirectoryNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(WatcherError::NotADirectory(path.display().to_string()));
    }
    Ok(path.canonicalize()?)
}

async fn debounce_events(
    mut raw_rx: mpsc::UnboundedReceiver<FileEvent>,
    event_tx: mpsc::UnboundedSender<FileEvent>,
    window: Duration,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            received = raw_rx.recv() => match received {
                Some(event) => {
                    if debouncer.push(event, Instant::now()) {
                        debug!("Coalesced repeated event");
                    }
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                for event in debouncer.drain_ready(Instant::now()) {
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
            }
        }
    }

    for event in debouncer.drain_all() {
        let _ = event_tx.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
