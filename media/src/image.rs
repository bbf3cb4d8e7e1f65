//! Still-image watermarking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader, imageops};
use tracing::debug;

use crate::classify::MediaKind;
use crate::error::{MediaError, Result};
use crate::output::{StagedOutput, output_path};
use crate::processor::MediaProcessor;
use crate::watermark::Watermark;

/// Where a resized watermark goes on a base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge, from the top-left origin.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Resized watermark width.
    pub width: u32,
    /// Resized watermark height.
    pub height: u32,
}

/// Size and center a watermark on a `base` sized image.
///
/// The watermark is shrunk to fit within `floor(base * scale)` on both axes,
/// keeping its aspect ratio, and is never enlarged.
pub fn image_placement(base: (u32, u32), mark: (u32, u32), scale: f64) -> Placement {
    let (base_w, base_h) = base;
    let box_w = ((f64::from(base_w) * scale).floor() as u32).max(1);
    let box_h = ((f64::from(base_h) * scale).floor() as u32).max(1);
    let (width, height) = fit_within(mark, (box_w, box_h));

    Placement {
        x: base_w.saturating_sub(width) / 2,
        y: base_h.saturating_sub(height) / 2,
        width,
        height,
    }
}

/// Largest size with `size`'s aspect ratio that fits in `bounds`, no upscaling.
fn fit_within(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (w, h) = size;
    let (bw, bh) = bounds;
    if w <= bw && h <= bh {
        return (w, h);
    }

    let (w64, h64, bw64, bh64) = (u64::from(w), u64::from(h), u64::from(bw), u64::from(bh));
    if w64 * bh64 >= h64 * bw64 {
        let nh = (h64 * bw64 / w64).clamp(1, bh64);
        (bw, nh as u32)
    } else {
        let nw = (w64 * bh64 / h64).clamp(1, bw64);
        (nw as u32, bh)
    }
}

/// Watermarks JPEG and PNG files.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    watermark: Arc<Watermark>,
    scale: f64,
}

impl ImageProcessor {
    /// Create a processor that scales the watermark to `scale` of each image.
    pub fn new(watermark: Arc<Watermark>, scale: f64) -> Self {
        Self { watermark, scale }
    }
}

#[async_trait]
impl MediaProcessor for ImageProcessor {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    async fn process(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        let staged = StagedOutput::new(output_path(source, target_dir)?);
        let format = ImageFormat::from_path(staged.final_path())
            .map_err(|_| MediaError::Ignored(source.to_path_buf()))?;

        let watermark = Arc::clone(&self.watermark);
        let scale = self.scale;
        let src = source.to_path_buf();
        let part = staged.part_path().to_path_buf();

        // Decoding and blending are CPU bound.
        let outcome = match tokio::task::spawn_blocking(move || {
            composite_file(&src, &watermark, scale, &part, format)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(MediaError::encode(source, format!("image task failed: {e}"))),
        };

        match outcome {
            Ok(()) => staged.commit().await,
            Err(e) => {
                staged.discard().await;
                Err(e)
            }
        }
    }
}

fn composite_file(
    source: &Path,
    watermark: &Watermark,
    scale: f64,
    dest: &Path,
    format: ImageFormat,
) -> Result<()> {
    let base = open_image(source)?;
    let placement = image_placement((base.width(), base.height()), watermark.dimensions(), scale);
    debug!(?placement, "Placing watermark on {}", source.display());

    let mark = watermark.resized(placement.width, placement.height);
    let mut canvas = base.to_rgba8();
    imageops::overlay(
        &mut canvas,
        mark.as_ref(),
        i64::from(placement.x),
        i64::from(placement.y),
    );

    // JPEG has no alpha channel; keep the source's channel layout.
    let composited = if base.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8())
    };

    composited
        .save_with_format(dest, format)
        .map_err(|e| MediaError::encode(dest, e))
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::NotFound(path.to_path_buf())
        } else {
            MediaError::Io(e)
        }
    })?;

    reader
        .with_guessed_format()
        .map_err(|e| MediaError::decode(path, e))?
        .decode()
        .map_err(|e| MediaError::decode(path, e))
}
