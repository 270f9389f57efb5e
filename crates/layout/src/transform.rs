//! Video track transform composition.
//!
//! Non-portrait renders reproduce the crop and zoom the user saw in the
//! on-screen preview player, so the exported file matches the preview.

use serde::{Deserialize, Serialize};

use crate::geometry::{AffineTransform, Dimensions, Rect};

/// Where the caller previewed the video on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewGeometry {
    /// The player's frame, in device-independent units.
    pub frame: Rect,
    /// Height of the whole preview viewport (the screen), same units.
    pub viewport_height: f64,
}

/// Inputs to transform composition.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput {
    /// Rotation correction stored with the source track.
    pub intrinsic: AffineTransform,
    pub portrait_intent: bool,
    pub working_size: Dimensions,
    pub canvas: Dimensions,
    pub preview: PreviewGeometry,
}

/// Scale and offset that map the working video onto the fixed canvas the
/// way the preview showed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewFit {
    /// Canvas pixels per preview unit.
    pub display_scale: f64,
    /// Anisotropic fit scale `(sx, sy)`.
    pub fit_scale: (f64, f64),
    /// Vertical centering offset in canvas pixels.
    pub translate_y: f64,
}

impl PreviewFit {
    pub fn compute(working_size: Dimensions, canvas: Dimensions, preview: &PreviewGeometry) -> Self {
        let display_scale = canvas.height / preview.viewport_height;
        let preview_height = preview.frame.height * display_scale;
        Self {
            display_scale,
            fit_scale: (
                canvas.width / working_size.width,
                preview_height / working_size.height,
            ),
            translate_y: (canvas.height - preview_height) / 2.0,
        }
    }

    /// `fit_scale` followed by the centering translate.
    pub fn transform(&self) -> AffineTransform {
        AffineTransform::scale(self.fit_scale.0, self.fit_scale.1)
            .concat(&AffineTransform::translation(0.0, self.translate_y))
    }
}

/// Compose the transform applied to the video track.
///
/// Portrait renders use the intrinsic correction as-is. Everything else is
/// `intrinsic`, then the preview fit scale, then the centering translate.
pub fn compose_video_transform(input: &TransformInput) -> AffineTransform {
    if input.portrait_intent {
        return input.intrinsic;
    }

    let fit = PreviewFit::compute(input.working_size, input.canvas, &input.preview);
    tracing::debug!(
        display_scale = fit.display_scale,
        scale_x = fit.fit_scale.0,
        scale_y = fit.fit_scale.1,
        translate_y = fit.translate_y,
        "Preview fit computed"
    );
    input.intrinsic.concat(&fit.transform())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(height: f64, viewport_height: f64) -> PreviewGeometry {
        PreviewGeometry {
            frame: Rect::new(0.0, 120.0, 390.0, height),
            viewport_height,
        }
    }

    #[test]
    fn test_portrait_returns_intrinsic_only() {
        let natural = Dimensions::new(1920.0, 1080.0);
        let intrinsic = AffineTransform::quarter_turn(1, natural);
        let transform = compose_video_transform(&TransformInput {
            intrinsic,
            portrait_intent: true,
            working_size: Dimensions::new(1080.0, 1920.0),
            canvas: Dimensions::new(1080.0, 1920.0),
            preview: preview(400.0, 844.0),
        });
        assert_eq!(transform, intrinsic);
    }

    #[test]
    fn test_landscape_fit_centers_vertically() {
        let canvas = Dimensions::new(720.0, 1280.0);
        let working = Dimensions::new(1920.0, 1080.0);
        let viewport_height = 800.0;
        let transform = compose_video_transform(&TransformInput {
            intrinsic: AffineTransform::IDENTITY,
            portrait_intent: false,
            working_size: working,
            canvas,
            preview: preview(400.0, viewport_height),
        });

        let display_scale = 1280.0 / viewport_height;
        let expected_ty = (1280.0 - 400.0 * display_scale) / 2.0;
        assert!((transform.ty - expected_ty).abs() < 1e-9);
        assert!(transform.ty > 0.0);
        assert_eq!(transform.tx, 0.0);
        assert!((transform.a - 720.0 / 1920.0).abs() < 1e-9);
        assert!((transform.d - 400.0 * display_scale / 1080.0).abs() < 1e-9);

        // The source's full width lands across the full canvas width.
        let placed = transform.apply_to_rect(&Rect::from_size(working));
        assert!((placed.width - 720.0).abs() < 1e-9);
        assert!((placed.y - expected_ty).abs() < 1e-9);
        assert!((placed.max_y() - (expected_ty + 400.0 * display_scale)).abs() < 1e-9);
    }

    #[test]
    fn test_intrinsic_applied_before_fit() {
        let natural = Dimensions::new(1280.0, 720.0);
        let intrinsic = AffineTransform::quarter_turn(2, natural);
        let input = TransformInput {
            intrinsic,
            portrait_intent: false,
            working_size: natural,
            canvas: Dimensions::new(720.0, 1280.0),
            preview: preview(300.0, 640.0),
        };
        let fit = PreviewFit::compute(input.working_size, input.canvas, &input.preview);
        let expected = intrinsic
            .concat(&AffineTransform::scale(fit.fit_scale.0, fit.fit_scale.1))
            .concat(&AffineTransform::translation(0.0, fit.translate_y));
        assert!(compose_video_transform(&input).approx_eq(&expected));
    }

    #[test]
    fn test_full_height_preview_needs_no_offset() {
        let fit = PreviewFit::compute(
            Dimensions::new(1920.0, 1080.0),
            Dimensions::new(720.0, 1280.0),
            &preview(844.0, 844.0),
        );
        assert!(fit.translate_y.abs() < 1e-9);
        assert!((fit.fit_scale.1 - 1280.0 / 1080.0).abs() < 1e-9);
    }
}
