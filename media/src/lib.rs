//! # Media
//!
//! Classification and watermarking of still images and video clips.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Media                                  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  classify() ──► MediaKind ──► ProcessorSet                      │
//! │                                 │                               │
//! │                    ┌────────────┴────────────┐                  │
//! │                    ▼                         ▼                  │
//! │             ImageProcessor            VideoProcessor            │
//! │             (image crate)             (ffmpeg/ffprobe)          │
//! │                    │                         │                  │
//! │                    └──────► StagedOutput ◄───┘                  │
//! │                             target/ma_<name>                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod image;
pub mod output;
pub mod processor;
pub mod video;
pub mod watermark;

pub use classify::{MediaKind, classify};
pub use config::WatermarkConfig;
pub use error::{MediaError, Result};
pub use crate::image::{ImageProcessor, Placement, image_placement};
pub use output::{OUTPUT_PREFIX, StagedOutput, output_path};
pub use processor::{MediaProcessor, ProcessorSet};
pub use video::{Orientation, VideoLayout, VideoProcessor, video_layout};
pub use watermark::Watermark;

use std::sync::Arc;

/// Load the watermark once and build both processors around it.
pub fn processors_from_config(config: &WatermarkConfig) -> Result<ProcessorSet> {
    config.validate()?;
    let watermark = Arc::new(Watermark::load(&config.asset_path)?);

    Ok(ProcessorSet::new(
        Arc::new(ImageProcessor::new(Arc::clone(&watermark), config.image_scale)),
        Arc::new(VideoProcessor::new(
            watermark,
            config.video_scale_horizontal,
            config.video_scale_vertical,
        )),
    ))
}
