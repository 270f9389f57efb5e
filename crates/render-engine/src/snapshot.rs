//! Overlay snapshot providers.

use std::path::PathBuf;

use reframe_common::error::{ReframeError, ReframeResult};

/// Produces a raster image to composite over the video.
pub trait SnapshotProvider: Send + Sync {
    /// Path to an image file (PNG with alpha is preferred).
    fn snapshot(&self) -> ReframeResult<PathBuf>;
}

/// A pre-rendered overlay image on disk.
#[derive(Debug, Clone)]
pub struct ImageSnapshot {
    path: PathBuf,
}

impl ImageSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotProvider for ImageSnapshot {
    fn snapshot(&self) -> ReframeResult<PathBuf> {
        if !self.path.is_file() {
            return Err(ReframeError::FileNotFound {
                path: self.path.clone(),
            });
        }
        Ok(self.path.clone())
    }
}
