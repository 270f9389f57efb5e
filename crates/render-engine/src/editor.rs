//! The render service: one composited export per request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reframe_common::config::AppConfig;
use reframe_common::error::{ExportStatus, ReframeError, ReframeResult};
use reframe_common::logging::log_titled;
use reframe_layout::{Dimensions, LayoutRequest, LayoutResolver, PreviewGeometry};

use crate::compositor::build_composition;
use crate::export::{
    ByteBudget, ExportEngine, ExportJob, ExportPreset, FfmpegBackend, ProgressCallback,
};
use crate::probe::{FfprobeProbe, MediaProbe};
use crate::snapshot::SnapshotProvider;
use crate::thumbnail::FfmpegFrameExtractor;
use reframe_layout::ReferenceFrameSource;

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// One render request.
#[derive(Clone)]
pub struct RenderRequest {
    pub source: PathBuf,
    /// Render at the source's own portrait size instead of the fixed canvas.
    pub portrait: bool,
    pub overlay: Option<Arc<dyn SnapshotProvider>>,
    pub filter_enabled: bool,
    /// Where the caller previewed the video.
    pub preview: PreviewGeometry,
}

impl std::fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRequest")
            .field("source", &self.source)
            .field("portrait", &self.portrait)
            .field("overlay", &self.overlay.is_some())
            .field("filter_enabled", &self.filter_enabled)
            .field("preview", &self.preview)
            .finish()
    }
}

/// Composites and exports videos through injected media services.
///
/// Holds no per-request state; clones share the same services.
#[derive(Clone)]
pub struct VideoEditor {
    config: Arc<AppConfig>,
    resolver: LayoutResolver,
    probe: Arc<dyn MediaProbe>,
    frames: Arc<dyn ReferenceFrameSource>,
    engine: Arc<dyn ExportEngine>,
}

impl VideoEditor {
    /// Editor backed by the ffmpeg/ffprobe binaries named in `config`.
    pub fn new(config: AppConfig) -> ReframeResult<Self> {
        let tools = config.tools.clone();
        Self::with_services(
            config,
            Arc::new(FfprobeProbe::new(&tools.ffprobe)),
            Arc::new(FfmpegFrameExtractor::new(&tools.ffmpeg, &tools.ffprobe)),
            Arc::new(FfmpegBackend::new(&tools.ffmpeg)),
        )
    }

    pub fn with_services(
        config: AppConfig,
        probe: Arc<dyn MediaProbe>,
        frames: Arc<dyn ReferenceFrameSource>,
        engine: Arc<dyn ExportEngine>,
    ) -> ReframeResult<Self> {
        config.render.validate()?;
        let resolver = LayoutResolver::new(Dimensions::from_pixels(
            config.render.canvas_width,
            config.render.canvas_height,
        ))?;
        Ok(Self {
            config: Arc::new(config),
            resolver,
            probe,
            frames,
            engine,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Render `request` and return the location of the exported file.
    pub async fn render(&self, request: RenderRequest) -> ReframeResult<PathBuf> {
        self.render_with_progress(request, None).await
    }

    pub async fn render_with_progress(
        &self,
        request: RenderRequest,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        let editor = self.clone();
        tokio::task::spawn_blocking(move || editor.render_blocking(&request, progress))
            .await
            .map_err(|e| ReframeError::Other(anyhow::anyhow!("Render task failed: {e}")))?
    }

    /// Start rendering and deliver the result to `on_complete` exactly once,
    /// from the request's own task. Must be called within a tokio runtime.
    pub fn submit<F>(&self, request: RenderRequest, on_complete: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Option<PathBuf>) + Send + 'static,
    {
        let editor = self.clone();
        tokio::spawn(async move {
            let result = editor.render(request).await;
            on_complete(result.ok());
        })
    }

    /// Re-encode `source` without compositing, under the same byte budget.
    pub async fn compress(&self, source: PathBuf) -> ReframeResult<PathBuf> {
        let editor = self.clone();
        tokio::task::spawn_blocking(move || editor.compress_blocking(&source))
            .await
            .map_err(|e| ReframeError::Other(anyhow::anyhow!("Compress task failed: {e}")))?
    }

    fn render_blocking(
        &self,
        request: &RenderRequest,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        let result = self.run_render(request, progress);
        if let Err(err) = &result {
            if !matches!(err, ReframeError::Export { .. }) {
                log_titled("Error", &err.to_string());
            }
        }
        result
    }

    fn run_render(
        &self,
        request: &RenderRequest,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        tracing::info!(
            source = %request.source.display(),
            portrait = request.portrait,
            filter_enabled = request.filter_enabled,
            overlay = request.overlay.is_some(),
            "Starting render"
        );

        let media = self.probe.probe(&request.source)?;

        let layout = self.resolver.resolve(
            self.frames.as_ref(),
            &LayoutRequest {
                source: &request.source,
                natural_size: media.natural_size,
                intrinsic: media.intrinsic_transform(),
                portrait_intent: request.portrait,
                filter_enabled: request.filter_enabled,
                preview: request.preview,
            },
        )?;

        let overlay = match &request.overlay {
            Some(provider) => Some(provider.snapshot().map_err(|e| {
                ReframeError::resource(format!("Overlay snapshot unavailable: {e}"))
            })?),
            None => None,
        };

        let policy = &self.config.render;
        let composition = build_composition(
            &request.source,
            &media,
            &layout,
            policy.frame_rate,
            overlay,
        )?;

        let job = ExportJob {
            source: request.source.clone(),
            output_path: self.fresh_output_path()?,
            composition: Some(composition),
            preset: ExportPreset::Hd720,
            frame_rate: Some(policy.frame_rate),
            duration_secs: media.duration_secs,
            has_audio: media.has_audio,
            byte_limit: ByteBudget::new(policy.byte_budget_mib_per_sec)
                .limit_for(media.duration_secs),
            optimize_for_network: policy.optimize_for_network,
        };

        self.run_export(&job, progress)
    }

    fn compress_blocking(&self, source: &Path) -> ReframeResult<PathBuf> {
        let media = self.probe.probe(source).map_err(|err| {
            log_titled("Error", &err.to_string());
            err
        })?;
        let policy = &self.config.render;

        let job = ExportJob {
            source: source.to_path_buf(),
            output_path: self.fresh_output_path()?,
            composition: None,
            preset: ExportPreset::Highest,
            frame_rate: None,
            duration_secs: media.duration_secs,
            has_audio: media.has_audio,
            byte_limit: ByteBudget::new(policy.byte_budget_mib_per_sec)
                .limit_for(media.duration_secs),
            optimize_for_network: policy.optimize_for_network,
        };

        self.run_export(&job, None)
    }

    fn run_export(
        &self,
        job: &ExportJob,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        if !self.engine.is_available() {
            return Err(ReframeError::unsupported(format!(
                "Export engine '{}' is not available",
                self.engine.name()
            )));
        }

        tracing::info!(
            engine = self.engine.name(),
            output = %job.output_path.display(),
            byte_limit = job.byte_limit,
            "Submitting export"
        );
        let outcome = self.engine.export(job, progress);

        match outcome.status {
            ExportStatus::Completed => {
                check_file_size(
                    &job.output_path,
                    "The file size of the compressed file is: ",
                );
                Ok(job.output_path.clone())
            }
            status => {
                let detail = outcome
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "unknown error".to_string());
                log_titled("Error", "Something went wrong during export.");
                log_titled("Error", &detail);
                Err(ReframeError::export(status, detail))
            }
        }
    }

    /// `<output_dir>/<uuid>.<ext>`, unique per request.
    fn fresh_output_path(&self) -> ReframeResult<PathBuf> {
        let dir = self.config.output_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(format!(
            "{}.{}",
            uuid::Uuid::new_v4(),
            self.config.render.container_extension
        )))
    }
}

/// Log and return the size of `path` in MiB (0.0 when unreadable).
pub fn check_file_size(path: &Path, message: &str) -> f64 {
    let size_mib = std::fs::metadata(path)
        .map(|meta| meta.len() as f64 / BYTES_PER_MIB)
        .unwrap_or(0.0);
    tracing::info!(path = %path.display(), size_mib, "{message}{size_mib:.2}");
    size_mib
}
