//! Orientation inference from decoded frame content.
//!
//! A track's declared natural size ignores rotation metadata, so the
//! visual shape is read from a decoded reference frame instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use reframe_common::error::ReframeResult;

use crate::geometry::Dimensions;

/// Content-inferred orientation of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    LandscapeLeft,
}

impl Orientation {
    pub fn is_portrait(self) -> bool {
        matches!(self, Orientation::Portrait)
    }
}

/// Decodes a single reference frame of a video resource.
pub trait ReferenceFrameSource: Send + Sync {
    /// Size of the frame at time zero, with orientation metadata applied.
    fn reference_frame_size(&self, source: &Path) -> ReframeResult<Dimensions>;
}

/// Result of orientation inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferredOrientation {
    pub orientation: Orientation,
    pub size: Dimensions,
}

/// Classify a reference frame, falling back to portrait at the declared
/// size when no frame is available.
pub fn classify_reference_frame(
    declared: Dimensions,
    reference_frame: Option<Dimensions>,
) -> InferredOrientation {
    match reference_frame {
        None => InferredOrientation {
            orientation: Orientation::Portrait,
            size: declared,
        },
        Some(frame) if frame.is_landscape() => InferredOrientation {
            orientation: Orientation::LandscapeLeft,
            size: frame,
        },
        Some(frame) => InferredOrientation {
            orientation: Orientation::Portrait,
            size: frame,
        },
    }
}

/// Infer the visual orientation of `source`.
///
/// Extraction failures are logged and degrade to `Portrait` with the
/// declared natural size; they never abort the caller.
pub fn infer_orientation(
    frames: &dyn ReferenceFrameSource,
    source: &Path,
    declared: Dimensions,
) -> InferredOrientation {
    let reference_frame = match frames.reference_frame_size(source) {
        Ok(size) => Some(size),
        Err(e) => {
            tracing::warn!(
                source = %source.display(),
                error = %e,
                "Reference frame unavailable, assuming portrait"
            );
            None
        }
    };

    let inferred = classify_reference_frame(declared, reference_frame);
    tracing::debug!(
        orientation = ?inferred.orientation,
        width = inferred.size.width,
        height = inferred.size.height,
        "Orientation inferred"
    );
    inferred
}
