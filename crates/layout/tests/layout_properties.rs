use proptest::prelude::*;

use reframe_layout::{
    classify_reference_frame, compose_video_transform, resolve_canvas, AffineTransform,
    CanvasInput, Dimensions, InferredOrientation, Orientation, PreviewGeometry, Rect,
    TransformInput,
};

const CANVAS: Dimensions = Dimensions {
    width: 720.0,
    height: 1280.0,
};

fn dims() -> impl Strategy<Value = Dimensions> {
    (16.0f64..4096.0, 16.0f64..4096.0).prop_map(|(w, h)| Dimensions::new(w, h))
}

fn orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Portrait), Just(Orientation::LandscapeLeft)]
}

fn canvas_input() -> impl Strategy<Value = CanvasInput> {
    (dims(), dims(), orientation(), any::<bool>(), any::<bool>()).prop_map(
        |(inferred, natural, orientation, filter_enabled, portrait_intent)| CanvasInput {
            inferred: InferredOrientation {
                orientation,
                size: inferred,
            },
            natural_size: natural,
            filter_enabled,
            portrait_intent,
            target_canvas: CANVAS,
        },
    )
}

proptest! {
    #[test]
    fn reference_frame_shape_decides_orientation(declared in dims(), frame in dims()) {
        let inferred = classify_reference_frame(declared, Some(frame));
        prop_assert_eq!(inferred.size, frame);
        if frame.width > frame.height {
            prop_assert_eq!(inferred.orientation, Orientation::LandscapeLeft);
        } else {
            prop_assert_eq!(inferred.orientation, Orientation::Portrait);
        }
    }

    #[test]
    fn missing_frame_is_portrait_at_declared_size(declared in dims()) {
        let inferred = classify_reference_frame(declared, None);
        prop_assert_eq!(inferred.orientation, Orientation::Portrait);
        prop_assert_eq!(inferred.size, declared);
    }

    #[test]
    fn canvas_follows_intent(input in canvas_input()) {
        let frames = resolve_canvas(&input);
        if input.portrait_intent {
            prop_assert_eq!(frames.canvas_size, frames.working_size);
            prop_assert_eq!(frames.video, Rect::from_size(frames.working_size));
        } else {
            prop_assert_eq!(frames.canvas_size, CANVAS);
            prop_assert_eq!(frames.background, Rect::from_size(CANVAS));
        }
    }

    #[test]
    fn overlay_matches_background(input in canvas_input()) {
        let first = resolve_canvas(&input);
        let second = resolve_canvas(&input);
        prop_assert_eq!(first.overlay, first.background);
        prop_assert_eq!(first.overlay.x, 0.0);
        prop_assert_eq!(first.overlay.y, 0.0);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn non_portrait_video_layer_fills_canvas_at_origin(input in canvas_input()) {
        prop_assume!(!input.portrait_intent);
        let frames = resolve_canvas(&input);
        prop_assert_eq!(frames.video.x, 0.0);
        prop_assert_eq!(frames.video.y, 0.0);
        prop_assert!((frames.video.width - CANVAS.width).abs() < 1e-6);
        prop_assert!((frames.video.height - CANVAS.height).abs() < 1e-6);
    }

    #[test]
    fn portrait_transform_is_intrinsic(natural in dims(), turns in 0u8..4, preview_h in 1.0f64..900.0) {
        let intrinsic = AffineTransform::quarter_turn(turns, natural);
        let transform = compose_video_transform(&TransformInput {
            intrinsic,
            portrait_intent: true,
            working_size: natural,
            canvas: natural,
            preview: PreviewGeometry {
                frame: Rect::new(0.0, 0.0, 390.0, preview_h),
                viewport_height: 844.0,
            },
        });
        prop_assert_eq!(transform, intrinsic);
    }

    #[test]
    fn landscape_transform_keeps_quarter_turns(
        natural in dims(),
        turns in 0u8..4,
        preview_h in 1.0f64..900.0,
        viewport_h in 400.0f64..1400.0,
    ) {
        let intrinsic = AffineTransform::quarter_turn(turns, natural);
        let transform = compose_video_transform(&TransformInput {
            intrinsic,
            portrait_intent: false,
            working_size: natural,
            canvas: CANVAS,
            preview: PreviewGeometry {
                frame: Rect::new(0.0, 0.0, 390.0, preview_h),
                viewport_height: viewport_h,
            },
        });
        prop_assert_eq!(transform.quarter_turns(), Some(turns));

        if turns == 0 {
            let display_scale = CANVAS.height / viewport_h;
            let preview_px = preview_h * display_scale;
            let placed = transform.apply_to_rect(&Rect::from_size(natural));
            prop_assert!((placed.y - (CANVAS.height - preview_px) / 2.0).abs() < 1e-6);
            prop_assert!((placed.height - preview_px).abs() < 1e-6);
            prop_assert!((placed.width - CANVAS.width).abs() < 1e-6);
        }
    }
}
