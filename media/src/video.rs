//! Video watermarking.
//!
//! Every clip is normalized to one of two fixed resolutions, 1080x720 for
//! landscape and square sources and 720x1080 for portrait ones, whatever its
//! original aspect ratio. Sources that are not 3:2 or 2:3 get stretched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::classify::MediaKind;
use crate::error::{MediaError, Result};
use crate::ffmpeg::{FfmpegCommand, VideoInfo, probe_video};
use crate::output::{StagedOutput, output_path};
use crate::processor::MediaProcessor;
use crate::watermark::Watermark;

/// Length of the audio fade-out at the end of every clip, in seconds.
pub const AUDIO_FADE_OUT_SECS: f64 = 0.5;

/// Frame orientation of a source clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Taller than wide.
    Portrait,
    /// Wider than tall, or square.
    Landscape,
}

impl Orientation {
    /// Orientation of a `width` x `height` frame.
    pub fn of(width: u32, height: u32) -> Self {
        if height > width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    /// The fixed output resolution for this orientation.
    pub fn output_resolution(self) -> (u32, u32) {
        match self {
            Self::Portrait => (720, 1080),
            Self::Landscape => (1080, 720),
        }
    }
}

/// Output frame size plus watermark size and position for one clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoLayout {
    /// Orientation of the source.
    pub orientation: Orientation,
    /// Scale fraction that was applied.
    pub scale: f64,
    /// Output frame width and height.
    pub frame: (u32, u32),
    /// Watermark size after resizing, before padding.
    pub mark: (u32, u32),
    /// Watermark size including the transparent top and right margin.
    pub padded: (u32, u32),
    /// Top-left corner of the padded watermark.
    pub position: (u32, u32),
}

/// Lay out the watermark for a `source` sized clip.
///
/// The watermark height becomes `floor(frame_height * scale)` with its width
/// following the asset's aspect ratio. One transparent pixel is added on top
/// and on the right before centering.
pub fn video_layout(
    source: (u32, u32),
    mark: (u32, u32),
    horizontal_scale: f64,
    vertical_scale: f64,
) -> VideoLayout {
    let orientation = Orientation::of(source.0, source.1);
    let scale = match orientation {
        Orientation::Portrait => vertical_scale,
        Orientation::Landscape => horizontal_scale,
    };
    let (frame_w, frame_h) = orientation.output_resolution();

    let mark_h = ((f64::from(frame_h) * scale).floor() as u32).max(1);
    let mark_w = ((u64::from(mark.0) * u64::from(mark_h)) / u64::from(mark.1.max(1))).max(1) as u32;
    let padded = (mark_w + 1, mark_h + 1);

    VideoLayout {
        orientation,
        scale,
        frame: (frame_w, frame_h),
        mark: (mark_w, mark_h),
        padded,
        position: (
            frame_w.saturating_sub(padded.0) / 2,
            frame_h.saturating_sub(padded.1) / 2,
        ),
    }
}

impl VideoLayout {
    /// FFmpeg filter graph: resize the clip, resize and pad the watermark,
    /// overlay it. The single watermark frame repeats for the whole clip.
    pub fn filter_graph(&self) -> String {
        let (fw, fh) = self.frame;
        let (mw, mh) = self.mark;
        let (pw, ph) = self.padded;
        let (x, y) = self.position;
        format!(
            "[0:v]scale={fw}:{fh},setsar=1[base];\
             [1:v]format=rgba,scale={mw}:{mh},pad={pw}:{ph}:0:1:color=black@0[mark];\
             [base][mark]overlay={x}:{y}:format=auto[out]"
        )
    }
}

/// Audio filter fading out the last [`AUDIO_FADE_OUT_SECS`] of a clip.
pub fn fade_out_filter(duration: f64) -> String {
    let start = (duration - AUDIO_FADE_OUT_SECS).max(0.0);
    format!("afade=t=out:st={start:.3}:d={AUDIO_FADE_OUT_SECS}")
}

/// Watermarks MP4, AVI and MOV files by shelling out to FFmpeg.
#[derive(Debug, Clone)]
pub struct VideoProcessor {
    watermark: Arc<Watermark>,
    horizontal_scale: f64,
    vertical_scale: f64,
}

impl VideoProcessor {
    /// Create a processor with separate landscape and portrait scale fractions.
    pub fn new(watermark: Arc<Watermark>, horizontal_scale: f64, vertical_scale: f64) -> Self {
        Self {
            watermark,
            horizontal_scale,
            vertical_scale,
        }
    }

    /// Build the FFmpeg invocation for a probed clip.
    pub fn command(&self, source: &Path, info: &VideoInfo, dest: &Path) -> FfmpegCommand {
        let layout = video_layout(
            (info.width, info.height),
            self.watermark.dimensions(),
            self.horizontal_scale,
            self.vertical_scale,
        );
        debug!(?layout, "Video layout for {}", source.display());

        let mut cmd = FfmpegCommand::new(dest)
            .input(source)
            .input(self.watermark.path())
            .filter_complex(layout.filter_graph())
            .map("[out]")
            .video_codec("libx264")
            .pixel_format("yuv420p");

        if info.has_audio {
            cmd = cmd
                .map("0:a:0")
                .audio_filter(fade_out_filter(info.duration))
                .audio_codec("aac");
        }

        cmd
    }
}

#[async_trait]
impl MediaProcessor for VideoProcessor {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    async fn process(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        let staged = StagedOutput::new(output_path(source, target_dir)?);
        let info = probe_video(source).await?;
        info!(
            "Transcoding {} ({}x{}, {:.1}s)",
            source.display(),
            info.width,
            info.height,
            info.duration
        );

        let cmd = self.command(source, &info, staged.part_path());
        match cmd.run().await {
            Ok(()) => staged.commit().await,
            Err(e) => {
                staged.discard().await;
                Err(match e {
                    MediaError::Io(io) => MediaError::encode(source, io),
                    other => other,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use pretty_assertions::assert_eq;

    fn processor(mark: (u32, u32)) -> VideoProcessor {
        let wm = Watermark::from_pixels("/assets/wm.png", RgbaImage::new(mark.0, mark.1));
        VideoProcessor::new(Arc::new(wm), 0.45, 0.2)
    }

    #[test]
    fn test_orientation() {
        assert_eq!(Orientation::of(1920, 1080), Orientation::Landscape);
        assert_eq!(Orientation::of(1080, 1920), Orientation::Portrait);
        assert_eq!(Orientation::of(500, 500), Orientation::Landscape);
    }

    #[test]
    fn test_landscape_uses_horizontal_scale() {
        let layout = video_layout((1920, 1080), (400, 200), 0.45, 0.2);
        assert_eq!(layout.orientation, Orientation::Landscape);
        assert_eq!(layout.frame, (1080, 720));
        assert_eq!(layout.scale, 0.45);
        // 720 * 0.45 = 324 tall, 648 wide
        assert_eq!(layout.mark, (648, 324));
        assert_eq!(layout.padded, (649, 325));
        assert_eq!(layout.position, (215, 197));
    }

    #[test]
    fn test_portrait_uses_vertical_scale() {
        let layout = video_layout((1080, 1920), (400, 200), 0.45, 0.2);
        assert_eq!(layout.orientation, Orientation::Portrait);
        assert_eq!(layout.frame, (720, 1080));
        assert_eq!(layout.scale, 0.2);
        assert_eq!(layout.mark, (432, 216));
        assert_eq!(layout.position, (143, 431));
    }

    #[test]
    fn test_square_is_landscape() {
        let layout = video_layout((640, 640), (100, 100), 0.5, 0.1);
        assert_eq!(layout.frame, (1080, 720));
        assert_eq!(layout.mark, (360, 360));
    }

    #[test]
    fn test_filter_graph() {
        let layout = video_layout((1920, 1080), (400, 200), 0.45, 0.2);
        assert_eq!(
            layout.filter_graph(),
            "[0:v]scale=1080:720,setsar=1[base];\
             [1:v]format=rgba,scale=648:324,pad=649:325:0:1:color=black@0[mark];\
             [base][mark]overlay=215:197:format=auto[out]"
        );
    }

    #[test]
    fn test_fade_out_filter() {
        assert_eq!(fade_out_filter(10.0), "afade=t=out:st=9.500:d=0.5");
        assert_eq!(fade_out_filter(0.2), "afade=t=out:st=0.000:d=0.5");
    }

    #[test]
    fn test_command_with_audio() {
        let info = VideoInfo {
            width: 1920,
            height: 1080,
            duration: 10.0,
            has_audio: true,
        };
        let args = processor((400, 200))
            .command(Path::new("/src/clip.mp4"), &info, Path::new("/out/.ma_clip.part.mp4"))
            .build_args();

        assert!(args.windows(2).any(|w| w == ["-i", "/src/clip.mp4"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/assets/wm.png"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-af", "afade=t=out:st=9.500:d=0.5"]));
        assert_eq!(args.last().map(String::as_str), Some("/out/.ma_clip.part.mp4"));
    }

    #[test]
    fn test_command_without_audio() {
        let info = VideoInfo {
            width: 720,
            height: 1280,
            duration: 3.0,
            has_audio: false,
        };
        let args = processor((10, 10))
            .command(Path::new("/src/v.mov"), &info, Path::new("/out/.ma_v.part.mov"))
            .build_args();

        assert!(!args.iter().any(|a| a == "-af" || a == "-c:a"));
        assert!(args.iter().any(|a| a.contains("scale=720:1080")));
    }

    #[tokio::test]
    async fn test_missing_clip_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = processor((10, 10))
            .process(&dir.path().join("gone.mp4"), dir.path())
            .await;
        assert!(matches!(result, Err(MediaError::NotFound(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
