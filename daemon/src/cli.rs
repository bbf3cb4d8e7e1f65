//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use marca_media::WatermarkConfig;

use crate::config::RunContext;
use crate::error::{DaemonError, Result};

/// Watch a folder and write watermarked copies of its images and videos.
#[derive(Parser, Debug)]
#[command(name = "marca", version)]
pub struct Cli {
    /// TOML config file. Flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to watch
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Directory receiving ma_* outputs
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Watermark image (PNG with transparency)
    #[arg(long)]
    pub watermark: Option<PathBuf>,

    /// Watermark size as a fraction of the image
    #[arg(long)]
    pub image_scale: Option<f64>,

    /// Watermark height as a fraction of landscape video frames
    #[arg(long)]
    pub video_scale_horizontal: Option<f64>,

    /// Watermark height as a fraction of portrait video frames
    #[arg(long)]
    pub video_scale_vertical: Option<f64>,

    /// Video jobs allowed to run at once
    #[arg(long)]
    pub video_workers: Option<usize>,

    /// Image jobs allowed to run at once
    #[arg(long)]
    pub image_workers: Option<usize>,

    /// Coalesce events for the same file within this window
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Abandon jobs that have not started this long after shutdown begins
    #[arg(long)]
    pub grace_secs: Option<u64>,

    /// Let jobs writing the same output run concurrently
    #[arg(long)]
    pub allow_output_races: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run context from the config file, if any, and the flags.
    pub fn into_run_context(self) -> Result<RunContext> {
        let mut context = match self.config {
            Some(ref path) => RunContext::from_file(path)?,
            None => {
                let (Some(source), Some(target), Some(watermark)) =
                    (&self.source, &self.target, &self.watermark)
                else {
                    return Err(DaemonError::Config(
                        "--source, --target and --watermark are required without --config"
                            .to_string(),
                    ));
                };
                RunContext::new(source, target, WatermarkConfig::new(watermark))
            }
        };

        if let Some(source) = self.source {
            context.source_dir = source;
        }
        if let Some(target) = self.target {
            context.target_dir = target;
        }
        if let Some(watermark) = self.watermark {
            context.watermark.asset_path = watermark;
        }
        if let Some(scale) = self.image_scale {
            context.watermark.image_scale = scale;
        }
        if let Some(scale) = self.video_scale_horizontal {
            context.watermark.video_scale_horizontal = scale;
        }
        if let Some(scale) = self.video_scale_vertical {
            context.watermark.video_scale_vertical = scale;
        }
        if let Some(workers) = self.video_workers {
            context = context.with_video_jobs(workers);
        }
        if let Some(workers) = self.image_workers {
            context = context.with_image_jobs(workers);
        }
        if let Some(ms) = self.debounce_ms {
            context = context.with_debounce(Duration::from_millis(ms));
        }
        if let Some(secs) = self.grace_secs {
            context = context.with_shutdown_grace(Duration::from_secs(secs));
        }
        if self.allow_output_races {
            context = context.allow_output_races();
        }

        Ok(context)
    }
}
