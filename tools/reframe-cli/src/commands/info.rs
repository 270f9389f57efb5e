//! Show probe results and the resolved layout.

use std::path::PathBuf;

use reframe_common::config::AppConfig;
use reframe_layout::{Dimensions, LayoutRequest, LayoutResolver, PreviewGeometry, Rect};
use reframe_render_engine::{FfmpegFrameExtractor, FfprobeProbe, MediaProbe};

pub fn run(config: &AppConfig, source: PathBuf, json: bool) -> anyhow::Result<()> {
    let probe = FfprobeProbe::new(&config.tools.ffprobe);
    let media = probe
        .probe(&source)
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", source.display()))?;

    let resolver = LayoutResolver::new(Dimensions::from_pixels(
        config.render.canvas_width,
        config.render.canvas_height,
    ))?;
    let frames = FfmpegFrameExtractor::new(&config.tools.ffmpeg, &config.tools.ffprobe);
    let viewport_height = config.render.preview_viewport_height;
    let layout = resolver.resolve(
        &frames,
        &LayoutRequest {
            source: &source,
            natural_size: media.natural_size,
            intrinsic: media.intrinsic_transform(),
            portrait_intent: true,
            filter_enabled: false,
            preview: PreviewGeometry {
                frame: Rect::new(0.0, 0.0, 0.0, viewport_height),
                viewport_height,
            },
        },
    )?;

    if json {
        let report = serde_json::json!({
            "source": source,
            "media": media,
            "layout": layout,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Source: {}", source.display());
    println!("  Duration: {:.2}s", media.duration_secs);
    println!(
        "  Natural size: {}x{}",
        media.natural_size.width, media.natural_size.height
    );
    println!("  Rotation: {} degrees clockwise", media.rotation_cw_degrees);
    println!("  Codec: {}", media.video_codec);
    println!("  Audio: {}", if media.has_audio { "yes" } else { "no" });
    println!(
        "  File size: {:.2} MiB",
        media.file_size_bytes as f64 / 1_048_576.0
    );
    println!();

    println!("Layout:");
    println!("  Orientation: {:?}", layout.orientation);
    println!(
        "  Portrait canvas: {}x{}",
        layout.layers.canvas_size.width, layout.layers.canvas_size.height
    );
    println!(
        "  Fixed canvas: {}x{}",
        resolver.canvas().width,
        resolver.canvas().height
    );

    Ok(())
}
