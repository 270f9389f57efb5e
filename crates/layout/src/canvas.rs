//! Canvas geometry: working video size and per-layer frames.

use serde::{Deserialize, Serialize};

use crate::geometry::{AffineTransform, Dimensions, Rect};
use crate::orientation::InferredOrientation;

/// Inputs to canvas geometry resolution.
#[derive(Debug, Clone, Copy)]
pub struct CanvasInput {
    /// Result of orientation inference.
    pub inferred: InferredOrientation,
    /// The track's declared size, before rotation correction.
    pub natural_size: Dimensions,
    /// A color filter runs in the track's native coordinate space.
    pub filter_enabled: bool,
    /// Caller wants the video rendered at its own portrait size.
    pub portrait_intent: bool,
    /// Fixed canvas used for every non-portrait render.
    pub target_canvas: Dimensions,
}

/// Frames of every visual layer submitted to the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerFrames {
    /// Size the video content is laid out at.
    pub working_size: Dimensions,
    /// Size of the rendered output.
    pub canvas_size: Dimensions,
    pub background: Rect,
    pub video: Rect,
    pub overlay: Rect,
}

/// Working video size: the inferred size only for unfiltered portrait
/// sources, otherwise the raw declared size.
pub fn working_video_size(input: &CanvasInput) -> Dimensions {
    if input.inferred.orientation.is_portrait() && !input.filter_enabled {
        input.inferred.size
    } else {
        input.natural_size
    }
}

/// Resolve the output canvas and layer frames.
///
/// The working size must be non-empty; callers reject zero-area sources
/// before getting here.
pub fn resolve_canvas(input: &CanvasInput) -> LayerFrames {
    let working_size = working_video_size(input);
    let canvas_size = if input.portrait_intent {
        working_size
    } else {
        input.target_canvas
    };

    let full_canvas = Rect::from_size(canvas_size);
    let video = if input.portrait_intent {
        Rect::from_size(working_size)
    } else {
        // Stretch the layer onto the fixed canvas, then pin it back to the
        // origin since scaling moves it.
        let fill = AffineTransform::scale(
            input.target_canvas.width / working_size.width,
            input.target_canvas.height / working_size.height,
        );
        let scaled = fill.apply_to_rect(&Rect::from_size(working_size));
        scaled.with_origin(0.0, 0.0)
    };

    LayerFrames {
        working_size,
        canvas_size,
        background: full_canvas,
        video,
        overlay: full_canvas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;

    const CANVAS: Dimensions = Dimensions {
        width: 720.0,
        height: 1280.0,
    };

    fn input(
        orientation: Orientation,
        inferred: Dimensions,
        natural: Dimensions,
        filter_enabled: bool,
        portrait_intent: bool,
    ) -> CanvasInput {
        CanvasInput {
            inferred: InferredOrientation {
                orientation,
                size: inferred,
            },
            natural_size: natural,
            filter_enabled,
            portrait_intent,
            target_canvas: CANVAS,
        }
    }

    #[test]
    fn test_portrait_source_renders_at_own_size() {
        let size = Dimensions::new(1080.0, 1920.0);
        let frames = resolve_canvas(&input(Orientation::Portrait, size, size, false, true));

        assert_eq!(frames.working_size, size);
        assert_eq!(frames.canvas_size, size);
        assert_eq!(frames.video, Rect::from_size(size));
        assert_eq!(frames.overlay, frames.video);
        assert_eq!(frames.background, frames.video);
    }

    #[test]
    fn test_filter_bypasses_inferred_size() {
        let natural = Dimensions::new(1920.0, 1080.0);
        let upright = Dimensions::new(1080.0, 1920.0);
        let frames = resolve_canvas(&input(Orientation::Portrait, upright, natural, true, true));
        assert_eq!(frames.working_size, natural);
        assert_eq!(frames.canvas_size, natural);
    }

    #[test]
    fn test_landscape_inference_uses_natural_size() {
        let natural = Dimensions::new(1280.0, 720.0);
        let frames = resolve_canvas(&input(
            Orientation::LandscapeLeft,
            natural,
            natural,
            false,
            true,
        ));
        assert_eq!(frames.working_size, natural);
    }

    #[test]
    fn test_non_portrait_intent_uses_fixed_canvas() {
        let natural = Dimensions::new(1920.0, 1080.0);
        let frames = resolve_canvas(&input(
            Orientation::LandscapeLeft,
            natural,
            natural,
            false,
            false,
        ));

        assert_eq!(frames.working_size, natural);
        assert_eq!(frames.canvas_size, CANVAS);
        assert_eq!(frames.background, Rect::from_size(CANVAS));
        assert_eq!(frames.overlay, Rect::from_size(CANVAS));
        assert_eq!(frames.video.x, 0.0);
        assert_eq!(frames.video.y, 0.0);
        assert!((frames.video.width - CANVAS.width).abs() < 1e-9);
        assert!((frames.video.height - CANVAS.height).abs() < 1e-9);
    }
}
