//! Bounded worker pool that runs watermark jobs.
//!
//! Submissions go into an unbounded queue and never wait on processing. A
//! single dispatch task turns queued jobs into worker tasks; separate
//! semaphores cap how many image and video jobs run at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use marca_media::{MediaKind, ProcessorSet, classify, output_path};
use tokio::sync::{OwnedMutexGuard, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::{DaemonError, Result};
use crate::job::Job;

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Where outputs are written.
    pub target_dir: PathBuf,

    /// Maximum concurrent video jobs.
    pub video_workers: usize,

    /// Maximum concurrent image jobs.
    pub image_workers: usize,

    /// Run jobs targeting the same output path one after another.
    pub serialize_output_paths: bool,
}

impl DispatcherConfig {
    /// Create a config with 2 video workers, 4 image workers and path
    /// serialization on.
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            video_workers: 2,
            image_workers: 4,
            serialize_output_paths: true,
        }
    }

    /// Set the video worker count.
    pub fn with_video_workers(mut self, workers: usize) -> Self {
        self.video_workers = workers;
        self
    }

    /// Set the image worker count.
    pub fn with_image_workers(mut self, workers: usize) -> Self {
        self.image_workers = workers;
        self
    }

    /// Allow concurrent jobs for the same output path (last writer wins).
    pub fn allow_output_races(mut self) -> Self {
        self.serialize_output_paths = false;
        self
    }
}

/// Snapshot of job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Jobs accepted by [`WorkDispatcher::submit`].
    pub submitted: u64,

    /// Jobs that wrote their output.
    pub succeeded: u64,

    /// Jobs that failed; each failure was logged.
    pub failed: u64,

    /// Jobs dropped because the file no longer classified as media.
    pub skipped: u64,

    /// Jobs never started because the shutdown grace period ran out.
    pub abandoned: u64,
}

impl DispatcherStats {
    /// Jobs that reached a final state.
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.skipped + self.abandoned
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    abandoned: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Async mutex per output path.
#[derive(Debug, Default)]
struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    async fn lock(&self, path: &Path) -> PathGuard<'_> {
        let mutex = {
            let mut locks = lock_unpoisoned(&self.locks);
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        let guard = mutex.lock_owned().await;

        PathGuard {
            owner: self,
            path: path.to_path_buf(),
            guard: Some(guard),
        }
    }
}

struct PathGuard<'a> {
    owner: &'a PathLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_unpoisoned(&self.owner.locks);
        // only the map's own reference left: nobody holds or waits for it
        if locks
            .get(&self.path)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            locks.remove(&self.path);
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by every worker task.
struct Workers {
    processors: ProcessorSet,
    target_dir: PathBuf,
    video_slots: Semaphore,
    image_slots: Semaphore,
    path_locks: Option<PathLocks>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
}

impl Workers {
    async fn run(&self, job: Job) {
        // The file may have changed since the event was raised.
        let kind = classify(&job.source_path);
        let Some(processor) = self.processors.for_kind(kind) else {
            debug!("Skipping {}: no longer media", job.source_path.display());
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let output = match output_path(&job.source_path, &self.target_dir) {
            Ok(output) => output,
            Err(e) => {
                warn!("Skipping {}: {e}", job.source_path.display());
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let slots = match kind {
            MediaKind::Video => &self.video_slots,
            _ => &self.image_slots,
        };

        // Path lock before the worker slot, so a job waiting on a busy path
        // does not keep a slot idle.
        let acquire = async {
            let path_guard = match self.path_locks {
                Some(ref locks) => Some(locks.lock(&output).await),
                None => None,
            };
            let permit = slots.acquire().await;
            (path_guard, permit)
        };

        let (_path_guard, permit) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("Abandoning {}: shutdown grace period elapsed", job.source_path.display());
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                return;
            }
            acquired = acquire => acquired,
        };
        let Ok(_permit) = permit else {
            self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
            return;
        };

        debug!(
            kind = %kind,
            trigger = ?job.trigger,
            waited_ms = job.enqueued_at.elapsed().as_millis() as u64,
            "Starting {}",
            job.source_path.display()
        );

        match processor.process(&job.source_path, &self.target_dir).await {
            Ok(written) => {
                info!(
                    kind = %kind,
                    elapsed_ms = job.enqueued_at.elapsed().as_millis() as u64,
                    "Watermarked {} -> {}",
                    job.source_path.display(),
                    written.display()
                );
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.is_skippable() => {
                warn!(kind = %kind, "Skipped {}: {e}", job.source_path.display());
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                error!(kind = %kind, "Failed {}: {e}", job.source_path.display());
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Accepts jobs and runs them on a bounded pool.
pub struct WorkDispatcher {
    job_tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    counters: Arc<Counters>,
}

impl WorkDispatcher {
    /// Start the dispatch task. Must be called from within a Tokio runtime.
    pub fn start(config: DispatcherConfig, processors: ProcessorSet) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let counters = Arc::new(Counters::default());

        let workers = Arc::new(Workers {
            processors,
            target_dir: config.target_dir,
            video_slots: Semaphore::new(config.video_workers.max(1)),
            image_slots: Semaphore::new(config.image_workers.max(1)),
            path_locks: config.serialize_output_paths.then(PathLocks::default),
            cancel: cancel.clone(),
            counters: Arc::clone(&counters),
        });

        info!(
            video_workers = config.video_workers,
            image_workers = config.image_workers,
            serialize_output_paths = config.serialize_output_paths,
            "Work dispatcher started"
        );

        let dispatch_task = tokio::spawn(dispatch(job_rx, workers, tracker.clone()));

        Self {
            job_tx: Mutex::new(Some(job_tx)),
            dispatch_task: Mutex::new(Some(dispatch_task)),
            tracker,
            cancel,
            counters,
        }
    }

    /// Queue a job. Never waits for a worker.
    pub fn submit(&self, job: Job) -> Result<()> {
        let job_tx = lock_unpoisoned(&self.job_tx);
        let Some(ref tx) = *job_tx else {
            return Err(DaemonError::DispatcherClosed);
        };

        debug!(kind = %job.media_kind, "Queued {}", job.source_path.display());
        tx.send(job).map_err(|_| DaemonError::DispatcherClosed)?;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Current counters.
    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }

    /// Stop accepting jobs and wait for queued and running ones.
    ///
    /// With a grace period, jobs still waiting for a worker when it expires
    /// are abandoned. Jobs already running always finish.
    pub async fn shutdown(&self, grace: Option<Duration>) -> DispatcherStats {
        let sender = lock_unpoisoned(&self.job_tx).take();
        drop(sender);

        let dispatch_task = lock_unpoisoned(&self.dispatch_task).take();
        if let Some(task) = dispatch_task {
            if let Err(e) = task.await {
                error!("Dispatch task ended abnormally: {e}");
            }
        }

        self.tracker.close();
        info!("Waiting for {} outstanding jobs", self.tracker.len());

        match grace {
            None => self.tracker.wait().await,
            Some(grace) => {
                if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
                    warn!(
                        "Grace period of {grace:?} elapsed, abandoning jobs that have not started"
                    );
                    self.cancel.cancel();
                    self.tracker.wait().await;
                }
            }
        }

        self.stats()
    }
}

async fn dispatch(
    mut job_rx: mpsc::UnboundedReceiver<Job>,
    workers: Arc<Workers>,
    tracker: TaskTracker,
) {
    while let Some(job) = job_rx.recv().await {
        let workers = Arc::clone(&workers);
        tracker.spawn(async move { workers.run(job).await });
    }
    debug!("Job queue closed");
}
