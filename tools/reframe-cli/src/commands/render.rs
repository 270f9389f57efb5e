//! Composite a clip and export it.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use reframe_common::config::AppConfig;
use reframe_layout::{PreviewGeometry, Rect};
use reframe_render_engine::{
    ExportProgress, ImageSnapshot, RenderRequest, SnapshotProvider, VideoEditor,
};

pub struct RenderArgs {
    pub source: PathBuf,
    pub landscape: bool,
    pub overlay: Option<PathBuf>,
    pub filter: bool,
    pub preview_height: Option<f64>,
    pub viewport_height: Option<f64>,
    pub output: Option<PathBuf>,
}

pub async fn run(config: AppConfig, args: RenderArgs) -> anyhow::Result<()> {
    println!("Rendering: {}", args.source.display());

    let viewport_height = args
        .viewport_height
        .unwrap_or(config.render.preview_viewport_height);
    let preview = preview_geometry(&config, viewport_height, args.preview_height);

    println!(
        "  Mode: {}",
        if args.landscape { "fixed canvas" } else { "portrait" }
    );
    if let Some(overlay) = &args.overlay {
        println!("  Overlay: {}", overlay.display());
    }
    if !args.landscape {
        println!(
            "  Canvas: source size (fixed canvas is {}x{})",
            config.render.canvas_width, config.render.canvas_height
        );
    } else {
        println!(
            "  Canvas: {}x{} (preview {:.0} of {:.0})",
            config.render.canvas_width,
            config.render.canvas_height,
            preview.frame.height,
            preview.viewport_height
        );
    }

    let editor = VideoEditor::new(config)?;
    let request = RenderRequest {
        source: args.source,
        portrait: !args.landscape,
        overlay: args
            .overlay
            .map(|path| Arc::new(ImageSnapshot::new(path)) as Arc<dyn SnapshotProvider>),
        filter_enabled: args.filter,
        preview,
    };

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({:?}, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.stage,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    match editor.render_with_progress(request, Some(progress_cb)).await {
        Ok(exported) => {
            let path = super::deliver(exported, args.output)?;
            println!("\nRender complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!("\nRender failed: {e}");
            Err(e.into())
        }
    }
}

/// Preview player centered in the viewport, shaped like the fixed canvas.
fn preview_geometry(
    config: &AppConfig,
    viewport_height: f64,
    preview_height: Option<f64>,
) -> PreviewGeometry {
    let height = preview_height.unwrap_or(viewport_height);
    let aspect = config.render.canvas_width as f64 / config.render.canvas_height as f64;
    PreviewGeometry {
        frame: Rect::new(
            0.0,
            (viewport_height - height) / 2.0,
            viewport_height * aspect,
            height,
        ),
        viewport_height,
    }
}
