//! Startup, steady state and shutdown of one daemon run.

use std::future::Future;
use std::sync::Arc;

use marca_directory_watcher::{BootstrapScanner, DirectoryWatcher, FileEvent, WatcherError};
use marca_media::{ProcessorSet, processors_from_config};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::RunContext;
use crate::dispatcher::{DispatcherStats, WorkDispatcher};
use crate::error::{DaemonError, Result};
use crate::job::Job;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs submitted from the startup scan.
    pub bootstrapped: usize,

    /// Final job counters.
    pub stats: DispatcherStats,
}

/// Owns the scanner, watcher and dispatcher for one run.
///
/// Startup order: validate, load the watermark, scan the source directory,
/// submit existing files, then watch. Files created between the scan and the
/// watcher starting are not seen.
pub struct ProcessSupervisor {
    context: RunContext,
    ready: Option<oneshot::Sender<()>>,
}

impl ProcessSupervisor {
    /// Create a supervisor for `context`.
    pub fn new(context: RunContext) -> Self {
        Self {
            context,
            ready: None,
        }
    }

    /// Signal `ready` once the watcher is running.
    pub fn on_ready(mut self, ready: oneshot::Sender<()>) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Run until `shutdown` resolves, then drain and return the counters.
    ///
    /// Configuration problems, a missing source directory and an unusable
    /// watermark are returned before any job runs.
    pub async fn run<F>(self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        self.context.validate()?;
        let processors = processors_from_config(&self.context.watermark)?;
        self.run_with_processors(processors, shutdown).await
    }

    /// Like [`ProcessSupervisor::run`] with caller-supplied processors.
    pub async fn run_with_processors<F>(
        self,
        processors: ProcessorSet,
        shutdown: F,
    ) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let Self { context, ready } = self;

        let scanner = BootstrapScanner::new(&context.source_dir, &context.target_dir);
        let scan = tokio::task::spawn_blocking(move || scanner.scan())
            .await?
            .map_err(|e| match e {
                WatcherError::DirectoryNotFound(path) => {
                    DaemonError::Config(format!("source directory does not exist: {path}"))
                }
                other => DaemonError::Watcher(other),
            })?;

        let dispatcher = Arc::new(WorkDispatcher::start(
            context.dispatcher_config(),
            processors,
        ));

        let mut bootstrapped = 0;
        for event in &scan.events {
            if let Some(job) = Job::from_event(event) {
                dispatcher.submit(job)?;
                bootstrapped += 1;
            }
        }
        info!("Submitted {bootstrapped} existing files");

        let mut watcher = DirectoryWatcher::new(context.watch_config());
        let events = match watcher.start() {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to start watching: {e}");
                dispatcher.shutdown(context.shutdown_grace()).await;
                return Err(e.into());
            }
        };
        info!(
            "Watching {} -> {}",
            context.source_dir.display(),
            context.target_dir.display()
        );

        let delivery = tokio::spawn(deliver_events(events, Arc::clone(&dispatcher)));

        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        shutdown.await;
        info!("Shutdown requested, finishing outstanding jobs");

        watcher.stop().await;
        if let Err(e) = delivery.await {
            error!("Event delivery task ended abnormally: {e}");
        }

        let stats = dispatcher.shutdown(context.shutdown_grace()).await;
        info!(
            submitted = stats.submitted,
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            abandoned = stats.abandoned,
            "Stopped"
        );

        Ok(RunSummary {
            bootstrapped,
            stats,
        })
    }
}

/// Turn watcher events into jobs until the watcher closes its channel.
async fn deliver_events(
    mut events: mpsc::UnboundedReceiver<FileEvent>,
    dispatcher: Arc<WorkDispatcher>,
) {
    while let Some(event) = events.recv().await {
        let Some(job) = Job::from_event(&event) else {
            debug!("Ignoring {}", event.path.display());
            continue;
        };
        if let Err(e) = dispatcher.submit(job) {
            warn!("Dropping event for {}: {e}", event.path.display());
        }
    }
    debug!("Event delivery finished");
}
