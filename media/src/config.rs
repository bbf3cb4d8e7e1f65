//! Watermark configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};

/// Which watermark to apply and how large to make it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Path to the watermark image. Should carry an alpha channel.
    pub asset_path: PathBuf,

    /// Fraction of the base image's dimensions the watermark may occupy.
    pub image_scale: f64,

    /// Fraction of the output height used for landscape and square clips.
    pub video_scale_horizontal: f64,

    /// Fraction of the output height used for portrait clips.
    pub video_scale_vertical: f64,
}

impl WatermarkConfig {
    /// Create a config for the given asset with default scale fractions.
    pub fn new(asset_path: impl Into<PathBuf>) -> Self {
        Self {
            asset_path: asset_path.into(),
            ..Self::default()
        }
    }

    /// Set the image scale fraction.
    pub fn with_image_scale(mut self, scale: f64) -> Self {
        self.image_scale = scale;
        self
    }

    /// Set the scale fractions for landscape and portrait clips.
    pub fn with_video_scales(mut self, horizontal: f64, vertical: f64) -> Self {
        self.video_scale_horizontal = horizontal;
        self.video_scale_vertical = vertical;
        self
    }

    /// Check every scale fraction lies in (0, 1].
    pub fn validate(&self) -> Result<()> {
        let scales = [
            ("image_scale", self.image_scale),
            ("video_scale_horizontal", self.video_scale_horizontal),
            ("video_scale_vertical", self.video_scale_vertical),
        ];

        for (name, value) in scales {
            if !(value > 0.0 && value <= 1.0) {
                return Err(MediaError::InvalidScale { name, value });
            }
        }

        Ok(())
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from("watermark.png"),
            image_scale: 0.6,
            video_scale_horizontal: 0.45,
            video_scale_vertical: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = WatermarkConfig::new("/assets/wm.png");
        assert_eq!(config.asset_path, PathBuf::from("/assets/wm.png"));
        assert_eq!(config.image_scale, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_scales() {
        let zero = WatermarkConfig::new("wm.png").with_image_scale(0.0);
        assert!(matches!(
            zero.validate(),
            Err(MediaError::InvalidScale {
                name: "image_scale",
                ..
            })
        ));

        let too_big = WatermarkConfig::new("wm.png").with_video_scales(1.5, 0.2);
        assert!(too_big.validate().is_err());

        let nan = WatermarkConfig::new("wm.png").with_video_scales(0.4, f64::NAN);
        assert!(nan.validate().is_err());

        let full = WatermarkConfig::new("wm.png")
            .with_image_scale(1.0)
            .with_video_scales(1.0, 1.0);
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: WatermarkConfig =
            serde_json::from_str(r#"{"asset_path": "mark.png"}"#).unwrap();
        assert_eq!(config.asset_path, PathBuf::from("mark.png"));
        assert_eq!(config.video_scale_vertical, 0.2);
    }
}
