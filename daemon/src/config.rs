//! Run configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use marca_directory_watcher::WatchConfig;
use marca_media::WatermarkConfig;
use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatcherConfig;
use crate::error::{DaemonError, Result};

/// Everything a run needs. Immutable once the supervisor starts.
///
/// Loaded from TOML:
///
/// ```toml
/// source_dir = "/srv/photos"
/// target_dir = "/srv/photos-marked"
/// max_concurrent_video_jobs = 2
///
/// [watermark]
/// asset_path = "/srv/watermark.png"
/// image_scale = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    /// Directory to watch. Must exist.
    pub source_dir: PathBuf,

    /// Directory receiving `ma_*` outputs. Created if missing.
    pub target_dir: PathBuf,

    /// Watermark asset and scale fractions.
    #[serde(default)]
    pub watermark: WatermarkConfig,

    /// Video jobs allowed to run at once.
    #[serde(default = "default_video_jobs")]
    pub max_concurrent_video_jobs: usize,

    /// Image jobs allowed to run at once.
    #[serde(default = "default_image_jobs")]
    pub max_concurrent_image_jobs: usize,

    /// Per-path debounce window in milliseconds; 0 disables it.
    #[serde(default)]
    pub debounce_ms: u64,

    /// Run jobs for the same output path one at a time.
    #[serde(default = "default_true")]
    pub serialize_output_paths: bool,

    /// How long shutdown waits before abandoning jobs that have not started.
    /// Unset waits for every queued job.
    #[serde(default)]
    pub shutdown_grace_secs: Option<u64>,
}

fn default_video_jobs() -> usize {
    2
}

fn default_image_jobs() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

fn default_true() -> bool {
    true
}

impl RunContext {
    /// Create a context with default tuning.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
        watermark: WatermarkConfig,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            watermark,
            max_concurrent_video_jobs: default_video_jobs(),
            max_concurrent_image_jobs: default_image_jobs(),
            debounce_ms: 0,
            serialize_output_paths: true,
            shutdown_grace_secs: None,
        }
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DaemonError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text, path)
    }

    /// Parse TOML text; `origin` is only used in error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| DaemonError::ConfigFile {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Set how many video jobs may run at once.
    pub fn with_video_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_video_jobs = jobs;
        self
    }

    /// Set how many image jobs may run at once.
    pub fn with_image_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_image_jobs = jobs;
        self
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace_secs = Some(grace.as_secs());
        self
    }

    /// Let jobs for the same output path run concurrently.
    pub fn allow_output_races(mut self) -> Self {
        self.serialize_output_paths = false;
        self
    }

    /// Check values that would otherwise fail later or misbehave.
    ///
    /// Existence of the source directory is checked at startup by the scan.
    pub fn validate(&self) -> Result<()> {
        self.watermark
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        if self.max_concurrent_video_jobs == 0 {
            return Err(DaemonError::Config(
                "max_concurrent_video_jobs must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_image_jobs == 0 {
            return Err(DaemonError::Config(
                "max_concurrent_image_jobs must be at least 1".to_string(),
            ));
        }

        if same_dir(&self.source_dir, &self.target_dir) {
            return Err(DaemonError::Config(format!(
                "target_dir must differ from source_dir ({})",
                self.source_dir.display()
            )));
        }

        Ok(())
    }

    /// Shutdown grace period, if any.
    pub fn shutdown_grace(&self) -> Option<Duration> {
        self.shutdown_grace_secs.map(Duration::from_secs)
    }

    /// Watcher settings for the source directory.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            path: self.source_dir.clone(),
            debounce_ms: self.debounce_ms,
        }
    }

    /// Worker pool settings.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            target_dir: self.target_dir.clone(),
            video_workers: self.max_concurrent_video_jobs,
            image_workers: self.max_concurrent_image_jobs,
            serialize_output_paths: self.serialize_output_paths,
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let text = r#"
            source_dir = "/in"
            target_dir = "/out"

            [watermark]
            asset_path = "/wm.png"
        "#;

        let context = RunContext::from_toml(text, Path::new("marca.toml")).unwrap();
        assert_eq!(context.source_dir, PathBuf::from("/in"));
        assert_eq!(context.watermark.asset_path, PathBuf::from("/wm.png"));
        assert_eq!(context.watermark.image_scale, 0.6);
        assert_eq!(context.max_concurrent_video_jobs, 2);
        assert!(context.max_concurrent_image_jobs >= 1);
        assert_eq!(context.debounce_ms, 0);
        assert!(context.serialize_output_paths);
        assert_eq!(context.shutdown_grace(), None);
        assert!(context.validate().is_ok());
    }

    #[test]
    fn test_full_toml() {
        let text = r#"
            source_dir = "/in"
            target_dir = "/out"
            max_concurrent_video_jobs = 1
            max_concurrent_image_jobs = 8
            debounce_ms = 500
            serialize_output_paths = false
            shutdown_grace_secs = 30

            [watermark]
            asset_path = "/wm.png"
            image_scale = 0.5
            video_scale_horizontal = 0.3
            video_scale_vertical = 0.1
        "#;

        let context = RunContext::from_toml(text, Path::new("marca.toml")).unwrap();
        assert_eq!(context.watch_config().debounce_ms, 500);
        assert_eq!(context.shutdown_grace(), Some(Duration::from_secs(30)));

        let dispatcher = context.dispatcher_config();
        assert_eq!(dispatcher.video_workers, 1);
        assert_eq!(dispatcher.image_workers, 8);
        assert!(!dispatcher.serialize_output_paths);
    }

    #[test]
    fn test_missing_required_field() {
        let result = RunContext::from_toml(r#"source_dir = "/in""#, Path::new("bad.toml"));
        assert!(matches!(result, Err(DaemonError::ConfigFile { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = RunContext::new("/in", "/out", WatermarkConfig::new("/wm.png"));

        let no_workers = base.clone().with_video_jobs(0);
        assert!(matches!(no_workers.validate(), Err(DaemonError::Config(_))));

        let no_image_workers = base.clone().with_image_jobs(0);
        assert!(no_image_workers.validate().is_err());

        let mut bad_scale = base.clone();
        bad_scale.watermark.image_scale = 1.2;
        assert!(bad_scale.validate().is_err());

        let same = RunContext::new("/in", "/in", WatermarkConfig::new("/wm.png"));
        assert!(same.validate().is_err());
    }

    #[test]
    fn test_validate_detects_same_dir_through_dots() {
        let dir = TempDir::new().unwrap();
        let context = RunContext::new(
            dir.path(),
            dir.path().join("."),
            WatermarkConfig::new("/wm.png"),
        );
        assert!(context.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = TempDir::new().unwrap();
        let result = RunContext::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }
}
