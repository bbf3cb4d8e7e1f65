//! Media classification by file extension.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// What kind of media a file holds, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Still image (JPEG, PNG).
    Image,

    /// Video clip (MP4, AVI, MOV).
    Video,

    /// Anything else; never processed.
    Ignored,
}

impl MediaKind {
    /// Whether files of this kind get a watermarked copy.
    pub fn is_media(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

/// Classify a filename or path. Case-insensitive; never fails.
pub fn classify(path: impl AsRef<Path>) -> MediaKind {
    let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
        return MediaKind::Ignored;
    };

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" => MediaKind::Image,
        "mp4" | "avi" | "mov" => MediaKind::Video,
        _ => MediaKind::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_images_any_case() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "dir/d.jpeg", "/abs/e.PNG"] {
            assert_eq!(classify(name), MediaKind::Image, "{name}");
        }
    }

    #[test]
    fn test_videos_any_case() {
        for name in ["a.mp4", "b.AVI", "c.MoV", "/abs/clip.MP4"] {
            assert_eq!(classify(name), MediaKind::Video, "{name}");
        }
    }

    #[test]
    fn test_everything_else_is_ignored() {
        for name in [
            "notes.txt",
            "archive.tar.gz",
            "noext",
            ".png",
            "photo.png.tmp",
            "movie.mkv",
            "image.gif",
            "",
        ] {
            assert_eq!(classify(name), MediaKind::Ignored, "{name}");
        }
    }

    #[test]
    fn test_is_media() {
        assert!(MediaKind::Image.is_media());
        assert!(MediaKind::Video.is_media());
        assert!(!MediaKind::Ignored.is_media());
    }
}
