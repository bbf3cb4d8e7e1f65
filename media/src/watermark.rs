//! The watermark asset, decoded once and shared read-only by every job.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::info;

use crate::error::{MediaError, Result};

/// A decoded watermark image with its alpha channel.
#[derive(Debug, Clone)]
pub struct Watermark {
    path: PathBuf,
    pixels: RgbaImage,
}

impl Watermark {
    /// Decode the asset at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                MediaError::NotFound(path.to_path_buf())
            }
            other => MediaError::decode(path, other),
        })?;

        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(MediaError::decode(path, "watermark has no pixels"));
        }

        info!(
            "Loaded watermark {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );

        Ok(Self::from_pixels(path, pixels))
    }

    /// Wrap already decoded pixels.
    pub fn from_pixels(path: impl Into<PathBuf>, pixels: RgbaImage) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    /// Where the asset was loaded from. The video pipeline hands this to FFmpeg.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width and height of the original asset.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// The asset at `width` x `height`, borrowing when no resize is needed.
    pub fn resized(&self, width: u32, height: u32) -> Cow<'_, RgbaImage> {
        if self.pixels.dimensions() == (width, height) {
            Cow::Borrowed(&self.pixels)
        } else {
            Cow::Owned(imageops::resize(
                &self.pixels,
                width,
                height,
                FilterType::Lanczos3,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_png_asset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wm.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 128]))
            .save(&path)
            .unwrap();

        let wm = Watermark::load(&path).unwrap();
        assert_eq!(wm.dimensions(), (40, 20));
        assert_eq!(wm.path(), path.as_path());
    }

    #[test]
    fn test_load_missing_asset() {
        let dir = TempDir::new().unwrap();
        let result = Watermark::load(dir.path().join("missing.png"));
        assert!(matches!(result, Err(MediaError::NotFound(_))));
    }

    #[test]
    fn test_load_corrupt_asset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wm.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            Watermark::load(&path),
            Err(MediaError::Decode { .. })
        ));
    }

    #[test]
    fn test_resized_borrows_when_unchanged() {
        let wm = Watermark::from_pixels("wm.png", RgbaImage::new(8, 4));
        assert!(matches!(wm.resized(8, 4), Cow::Borrowed(_)));
        assert_eq!(wm.resized(4, 2).dimensions(), (4, 2));
    }
}
