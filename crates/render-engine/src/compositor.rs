//! Composition graph: the tracks and visual layers submitted for export.
//!
//! Layers stack bottom to top: black background, the rendered video
//! frame, then the optional overlay image.

use std::path::{Path, PathBuf};

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_layout::{AffineTransform, Dimensions, Rect, ResolvedLayout};

use crate::probe::MediaInfo;

/// A composition built for one render request.
#[derive(Debug, Clone)]
pub struct Composition {
    pub source: PathBuf,
    pub duration_secs: f64,
    pub frame_rate: u32,
    /// Size of the composited frame.
    pub render_size: Dimensions,
    pub video: VideoTrack,
    pub audio: Option<AudioTrack>,
    pub layers: Vec<Layer>,
}

/// The source video track and where it lands in the render frame.
#[derive(Debug, Clone)]
pub struct VideoTrack {
    pub natural_size: Dimensions,
    pub transform: AffineTransform,
    pub placement: VideoPlacement,
}

/// Pass-through of the source's first audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrack {
    pub stream_index: usize,
}

/// A transform reduced to operations an encoder filter chain can express:
/// quarter-turn rotation, resize, and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoPlacement {
    /// Clockwise quarter turns applied first.
    pub quarter_turns: u8,
    /// Size after rotation and scaling (even pixels).
    pub width: u32,
    pub height: u32,
    /// Top-left corner in the render frame. May be negative.
    pub x: i64,
    pub y: i64,
}

impl VideoPlacement {
    /// Reduce `transform` applied to a frame of `natural` size.
    pub fn from_transform(transform: &AffineTransform, natural: Dimensions) -> ReframeResult<Self> {
        let quarter_turns = transform.quarter_turns().ok_or_else(|| {
            ReframeError::unsupported(format!(
                "Video transform is not axis-aligned: {transform:?}"
            ))
        })?;

        let placed = transform.apply_to_rect(&Rect::from_size(natural));
        let (width, height) = placed.size().to_even_pixels();
        Ok(Self {
            quarter_turns,
            width,
            height,
            x: placed.x.round() as i64,
            y: placed.y.round() as i64,
        })
    }
}

/// A visual layer and its frame on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub kind: LayerKind,
    pub frame: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Solid black fill.
    Background,
    /// The composited video frame.
    Video,
    /// Snapshot image, scaled to fill its frame.
    Overlay { image: PathBuf },
}

impl Composition {
    pub fn layer(&self, matches: impl Fn(&LayerKind) -> bool) -> Option<&Layer> {
        self.layers.iter().find(|layer| matches(&layer.kind))
    }

    pub fn overlay_image(&self) -> Option<&Path> {
        self.layers.iter().find_map(|layer| match &layer.kind {
            LayerKind::Overlay { image } => Some(image.as_path()),
            _ => None,
        })
    }
}

/// Assemble the composition for `source`.
pub fn build_composition(
    source: &Path,
    media: &MediaInfo,
    layout: &ResolvedLayout,
    frame_rate: u32,
    overlay: Option<PathBuf>,
) -> ReframeResult<Composition> {
    if !(media.duration_secs > 0.0) {
        return Err(ReframeError::composition(format!(
            "Cannot insert a zero-length track from {}",
            source.display()
        )));
    }
    if media.natural_size.is_empty() {
        return Err(ReframeError::composition(format!(
            "Video track of {} has no frame size",
            source.display()
        )));
    }

    let placement = VideoPlacement::from_transform(&layout.video_transform, media.natural_size)?;

    let mut layers = vec![
        Layer {
            kind: LayerKind::Background,
            frame: layout.layers.background,
        },
        Layer {
            kind: LayerKind::Video,
            frame: layout.layers.video,
        },
    ];
    if let Some(image) = overlay {
        layers.push(Layer {
            kind: LayerKind::Overlay { image },
            frame: layout.layers.overlay,
        });
    }

    tracing::debug!(
        layers = layers.len(),
        quarter_turns = placement.quarter_turns,
        placed_width = placement.width,
        placed_height = placement.height,
        placed_x = placement.x,
        placed_y = placement.y,
        "Composition built"
    );

    Ok(Composition {
        source: source.to_path_buf(),
        duration_secs: media.duration_secs,
        frame_rate: frame_rate.max(1),
        render_size: layout.layers.canvas_size,
        video: VideoTrack {
            natural_size: media.natural_size,
            transform: layout.video_transform,
            placement,
        },
        audio: media.has_audio.then_some(AudioTrack { stream_index: 0 }),
        layers,
    })
}
