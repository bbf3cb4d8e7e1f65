//! Output naming and staged writes.
//!
//! Every output lands flat in the target directory as `ma_<original name>`.
//! Encoders write to a hidden `.part` sibling first and the result is renamed
//! into place only once it is complete, so a reader of the target directory
//! never observes a truncated `ma_*` file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MediaError, Result};

/// Prefix prepended to every output filename.
pub const OUTPUT_PREFIX: &str = "ma_";

/// Compute the output path for a source file.
///
/// Depends only on the source's file name, so the same source always maps to
/// the same output path.
pub fn output_path(source: &Path, target_dir: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| MediaError::Ignored(source.to_path_buf()))?;

    let mut prefixed = std::ffi::OsString::from(OUTPUT_PREFIX);
    prefixed.push(name);
    Ok(target_dir.join(prefixed))
}

/// An output being written to a temporary sibling of its final path.
#[derive(Debug)]
pub struct StagedOutput {
    final_path: PathBuf,
    part_path: PathBuf,
}

impl StagedOutput {
    /// Stage a write for `final_path`.
    pub fn new(final_path: impl Into<PathBuf>) -> Self {
        let final_path = final_path.into();
        let part_path = part_path_for(&final_path);
        Self {
            final_path,
            part_path,
        }
    }

    /// Where the encoder should write.
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Where the output ends up after [`StagedOutput::commit`].
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Move the finished file into place, replacing any previous output.
    pub async fn commit(self) -> Result<PathBuf> {
        tokio::fs::rename(&self.part_path, &self.final_path)
            .await
            .map_err(|e| MediaError::encode(&self.final_path, e))?;
        debug!("Committed output: {}", self.final_path.display());
        Ok(self.final_path)
    }

    /// Remove whatever the encoder left behind.
    pub async fn discard(self) {
        match tokio::fs::remove_file(&self.part_path).await {
            Ok(()) => debug!("Removed partial output: {}", self.part_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial output {}: {e}",
                self.part_path.display()
            ),
        }
    }
}

/// `.ma_clip.part.mp4` for `ma_clip.mp4`. The real extension stays last so
/// encoders that pick a format from it still do.
fn part_path_for(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match final_path.extension() {
        Some(ext) => format!(".{stem}.part.{}", ext.to_string_lossy()),
        None => format!(".{stem}.part"),
    };

    final_path.with_file_name(name)
}
