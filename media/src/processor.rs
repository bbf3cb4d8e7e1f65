//! The watermarking capability shared by both media kinds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::classify::MediaKind;
use crate::error::Result;

/// Produces a watermarked copy of one source file.
///
/// Implementations are stateless apart from their immutable configuration
/// and may be called concurrently.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// The media kind this processor handles.
    fn kind(&self) -> MediaKind;

    /// Watermark `source` and write `target_dir/ma_<name>`.
    ///
    /// Returns the path of the written file.
    async fn process(&self, source: &Path, target_dir: &Path) -> Result<PathBuf>;
}

/// One processor per media kind.
#[derive(Clone)]
pub struct ProcessorSet {
    image: Arc<dyn MediaProcessor>,
    video: Arc<dyn MediaProcessor>,
}

impl ProcessorSet {
    /// Pair an image processor with a video processor.
    pub fn new(image: Arc<dyn MediaProcessor>, video: Arc<dyn MediaProcessor>) -> Self {
        Self { image, video }
    }

    /// The processor for `kind`, or `None` for ignored files.
    pub fn for_kind(&self, kind: MediaKind) -> Option<&Arc<dyn MediaProcessor>> {
        match kind {
            MediaKind::Image => Some(&self.image),
            MediaKind::Video => Some(&self.video),
            MediaKind::Ignored => None,
        }
    }
}

impl std::fmt::Debug for ProcessorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorSet")
            .field("image", &self.image.kind())
            .field("video", &self.video.kind())
            .finish()
    }
}
