//! Layout resolver: orientation inference, canvas geometry, and transform
//! composition run in order for one render request.

use std::path::Path;

use serde::{Deserialize, Serialize};

use reframe_common::error::{ReframeError, ReframeResult};

use crate::canvas::{resolve_canvas, CanvasInput, LayerFrames};
use crate::geometry::{AffineTransform, Dimensions};
use crate::orientation::{infer_orientation, Orientation, ReferenceFrameSource};
use crate::transform::{compose_video_transform, PreviewGeometry, TransformInput};

/// Per-request inputs describing the source and the caller's intent.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub source: &'a Path,
    /// Declared size of the source video track.
    pub natural_size: Dimensions,
    /// Rotation correction stored with the track.
    pub intrinsic: AffineTransform,
    pub portrait_intent: bool,
    pub filter_enabled: bool,
    pub preview: PreviewGeometry,
}

/// Everything the compositor needs to place the video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLayout {
    pub orientation: Orientation,
    pub layers: LayerFrames,
    pub video_transform: AffineTransform,
}

/// Stateless resolver for a fixed target canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutResolver {
    canvas: Dimensions,
}

impl LayoutResolver {
    pub fn new(canvas: Dimensions) -> ReframeResult<Self> {
        if canvas.is_empty() {
            return Err(ReframeError::config(format!(
                "Target canvas must be non-empty, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        Ok(Self { canvas })
    }

    pub fn canvas(&self) -> Dimensions {
        self.canvas
    }

    /// Resolve the layout for one request.
    ///
    /// Performs one reference-frame decode through `frames`.
    pub fn resolve(
        &self,
        frames: &dyn ReferenceFrameSource,
        request: &LayoutRequest<'_>,
    ) -> ReframeResult<ResolvedLayout> {
        let inferred = infer_orientation(frames, request.source, request.natural_size);

        let canvas_input = CanvasInput {
            inferred,
            natural_size: request.natural_size,
            filter_enabled: request.filter_enabled,
            portrait_intent: request.portrait_intent,
            target_canvas: self.canvas,
        };
        let layers = resolve_canvas(&canvas_input);
        if layers.working_size.is_empty() {
            return Err(ReframeError::resource(format!(
                "Video track has no visible area ({}x{})",
                layers.working_size.width, layers.working_size.height
            )));
        }

        if !request.portrait_intent {
            if !(request.preview.viewport_height > 0.0) {
                return Err(ReframeError::config(
                    "Preview viewport height must be positive",
                ));
            }
            if !(request.preview.frame.height > 0.0) {
                return Err(ReframeError::config(format!(
                    "Preview frame height must be positive, got {}",
                    request.preview.frame.height
                )));
            }
        }

        let video_transform = compose_video_transform(&TransformInput {
            intrinsic: request.intrinsic,
            portrait_intent: request.portrait_intent,
            working_size: layers.working_size,
            canvas: self.canvas,
            preview: request.preview,
        });

        tracing::info!(
            orientation = ?inferred.orientation,
            working_width = layers.working_size.width,
            working_height = layers.working_size.height,
            canvas_width = layers.canvas_size.width,
            canvas_height = layers.canvas_size.height,
            "Layout resolved"
        );

        Ok(ResolvedLayout {
            orientation: inferred.orientation,
            layers,
            video_transform,
        })
    }
}
