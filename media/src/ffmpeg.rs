//! Thin wrappers around the `ffmpeg` and `ffprobe` command-line tools.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, Result};

/// Builder for a single FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input files, in `-i` order.
    inputs: Vec<PathBuf>,
    /// Output file path.
    output: PathBuf,
    /// Arguments placed between the inputs and the output.
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add an input file.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set the output pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ];

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().into_owned());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Run to completion. A non-zero exit is an encode failure.
    pub async fn run(&self) -> Result<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = self.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut command = Command::new("ffmpeg");
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        own_process_group(&mut command);
        let output = command.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::encode(
                &self.output,
                format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    last_lines(&stderr, 5)
                ),
            ));
        }

        Ok(())
    }
}

/// Keep terminal signals aimed at the daemon's process group away from the
/// child; encodes in flight must finish after Ctrl-C.
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}

/// What the video pipeline needs to know about a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Display width in pixels, after applying rotation metadata.
    pub width: u32,
    /// Display height in pixels, after applying rotation metadata.
    pub height: u32,
    /// Duration in seconds (0 when unknown).
    pub duration: f64,
    /// Whether the container carries an audio stream.
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

impl FfprobeStream {
    /// Rotation in degrees, normalized to 0..360. The display matrix wins
    /// over the legacy `rotate` tag.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|r| r.parse::<f64>().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

/// Probe a video file.
pub async fn probe_video(path: &Path) -> Result<VideoInfo> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let mut command = Command::new("ffprobe");
    command
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    own_process_group(&mut command);
    let output = command.output().await?;

    if !output.status.success() {
        return Err(MediaError::decode(
            path,
            format!("ffprobe exited with {}", output.status),
        ));
    }

    parse_probe(path, &output.stdout)
}

fn parse_probe(path: &Path, json: &[u8]) -> Result<VideoInfo> {
    let probe: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| MediaError::decode(path, e))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::decode(path, "no video stream"))?;

    let (coded_w, coded_h) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(MediaError::decode(path, "video stream has no dimensions")),
    };

    // FFmpeg auto-rotates on decode, so frames arrive in display orientation.
    let (width, height) = match video.rotation() {
        90 | 270 => (coded_h, coded_w),
        _ => (coded_w, coded_h),
    };

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width,
        height,
        duration,
        has_audio: probe.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::Orientation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_args_orders_inputs_before_output() {
        let cmd = FfmpegCommand::new("/out/.ma_a.part.mp4")
            .input("/src/a.mp4")
            .input("/wm.png")
            .filter_complex("[0:v][1:v]overlay[v]")
            .map("[v]")
            .video_codec("libx264");

        assert_eq!(
            cmd.build_args(),
            vec![
                "-y",
                "-nostdin",
                "-v",
                "error",
                "-i",
                "/src/a.mp4",
                "-i",
                "/wm.png",
                "-filter_complex",
                "[0:v][1:v]overlay[v]",
                "-map",
                "[v]",
                "-c:v",
                "libx264",
                "/out/.ma_a.part.mp4",
            ]
        );
    }

    #[test]
    fn test_parse_probe_with_audio() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio", "sample_rate": "44100"}
            ],
            "format": {"duration": "10.000000"}
        }"#;

        let info = parse_probe(Path::new("clip.mp4"), json).unwrap();
        assert_eq!(
            info,
            VideoInfo {
                width: 1920,
                height: 1080,
                duration: 10.0,
                has_audio: true,
            }
        );
    }

    #[test]
    fn test_parse_probe_rotated_phone_clip_is_portrait() {
        let json = br#"{
            "streams": [{
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]
            }],
            "format": {"duration": "4.0"}
        }"#;

        let info = parse_probe(Path::new("phone.mov"), json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(
            Orientation::of(info.width, info.height),
            Orientation::Portrait
        );
    }

    #[test]
    fn test_parse_probe_rotate_tag() {
        let json = br#"{
            "streams": [{
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "tags": {"rotate": "270"}
            }]
        }"#;
        let info = parse_probe(Path::new("old.mp4"), json).unwrap();
        assert_eq!((info.width, info.height), (720, 1280));

        let upside_down = br#"{
            "streams": [{
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "side_data_list": [{"rotation": 180}]
            }]
        }"#;
        let info = parse_probe(Path::new("flip.mp4"), upside_down).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe(Path::new("song.mp4"), json),
            Err(MediaError::Decode { .. })
        ));
    }

    #[test]
    fn test_parse_probe_garbage() {
        assert!(matches!(
            parse_probe(Path::new("x.mov"), b"not json"),
            Err(MediaError::Decode { .. })
        ));
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\nc", 2), "b | c");
        assert_eq!(last_lines("", 3), "");
    }
}
