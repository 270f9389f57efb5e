//! Export configuration and job management.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reframe_common::error::ExportStatus;
use reframe_layout::Dimensions;

use crate::compositor::{Composition, LayerKind, VideoPlacement};

const BYTES_PER_MIB: u64 = 1_048_576;

/// Size/quality tier of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPreset {
    /// Fit inside 1280x720 in either orientation.
    Hd720,
    /// Keep the composition size and favor quality.
    Highest,
}

impl ExportPreset {
    /// Output frame size for a composition of `canvas` size.
    pub fn constrain(self, canvas: Dimensions) -> Dimensions {
        match self {
            ExportPreset::Highest => canvas,
            ExportPreset::Hd720 => {
                let long = canvas.width.max(canvas.height);
                let short = canvas.width.min(canvas.height);
                let factor = (1280.0 / long).min(720.0 / short).min(1.0);
                Dimensions::new(canvas.width * factor, canvas.height * factor)
            }
        }
    }

    fn x264_crf(self) -> u8 {
        match self {
            ExportPreset::Hd720 => 23,
            ExportPreset::Highest => 18,
        }
    }

    fn x264_preset(self) -> &'static str {
        match self {
            ExportPreset::Hd720 => "medium",
            ExportPreset::Highest => "slow",
        }
    }

    fn audio_bitrate_kbps(self) -> u32 {
        match self {
            ExportPreset::Hd720 => 128,
            ExportPreset::Highest => 192,
        }
    }
}

/// Output size cap proportional to source duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteBudget {
    pub mib_per_sec: f64,
}

impl ByteBudget {
    pub fn new(mib_per_sec: f64) -> Self {
        Self { mib_per_sec }
    }

    /// `1 MiB x floor(duration x rate)`. Zero means no explicit cap.
    pub fn limit_for(&self, duration_secs: f64) -> u64 {
        let mib = (duration_secs * self.mib_per_sec).floor();
        if !mib.is_finite() || mib <= 0.0 {
            return 0;
        }
        BYTES_PER_MIB * mib as u64
    }
}

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub source: PathBuf,
    pub output_path: PathBuf,

    /// Layered composition. `None` transcodes the source as-is.
    pub composition: Option<Composition>,

    pub preset: ExportPreset,

    /// Output frame rate. `None` keeps the source rate.
    pub frame_rate: Option<u32>,

    pub duration_secs: f64,
    pub has_audio: bool,

    /// Maximum output size in bytes; 0 leaves it to the engine.
    pub byte_limit: u64,

    /// Place the index up front for progressive download.
    pub optimize_for_network: bool,
}

/// Terminal report of an export engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub status: ExportStatus,
    /// Engine-provided detail when the status is not `Completed`.
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn completed() -> Self {
        Self {
            status: ExportStatus::Completed,
            error: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: ExportStatus::Failed,
            error: Some(detail.into()),
        }
    }

    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self {
            status: ExportStatus::Cancelled,
            error: Some(detail.into()),
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

/// Engine that decodes, composites, encodes, and muxes an export job.
pub trait ExportEngine: Send + Sync {
    /// Run the job to completion. Blocks the calling thread.
    fn export(&self, job: &ExportJob, progress: Option<ProgressCallback>) -> ExportOutcome;

    /// Check if this engine is available on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// `ExportEngine` backed by the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<ProgressCallback>,
    ) -> ExportOutcome {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExportOutcome::failed(format!("Failed to start ffmpeg: {e}")),
        };

        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return ExportOutcome::failed("Failed to capture ffmpeg output");
        };

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest_progress = ProgressState::default();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed reading ffmpeg progress");
                    break;
                }
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest_progress.update(key, value);
            if key == "progress" {
                if let Some(cb) = &progress {
                    cb(progress_report(
                        &latest_progress,
                        expected_duration_secs,
                        start.elapsed().as_secs_f64(),
                    ));
                }
            }
        }

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => return ExportOutcome::failed(format!("Failed to wait on ffmpeg: {e}")),
        };

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if status.success() {
            if let Some(cb) = &progress {
                cb(ExportProgress {
                    progress: 1.0,
                    eta_secs: 0.0,
                    stage: ExportStage::Complete,
                });
            }
            tracing::info!(elapsed_secs = start.elapsed().as_secs_f64(), "ffmpeg finished");
            return ExportOutcome::completed();
        }

        let detail = failure_detail(&stderr_output);
        match status.code() {
            // Terminated by a signal rather than exiting on its own.
            None => ExportOutcome::cancelled(format!("ffmpeg was terminated: {detail}")),
            Some(code) => ExportOutcome::failed(format!("ffmpeg exited with {code}: {detail}")),
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl ExportEngine for FfmpegBackend {
    fn export(&self, job: &ExportJob, progress: Option<ProgressCallback>) -> ExportOutcome {
        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: 0.0,
                eta_secs: 0.0,
                stage: ExportStage::Preparing,
            });
        }

        let args = build_ffmpeg_args(job);
        tracing::info!(
            output = %job.output_path.display(),
            composited = job.composition.is_some(),
            byte_limit = job.byte_limit,
            "Export plan built"
        );
        let outcome = self.run_ffmpeg(&args, job.duration_secs, progress);
        if outcome.status != ExportStatus::Completed && job.output_path.exists() {
            if let Err(e) = std::fs::remove_file(&job.output_path) {
                tracing::warn!(error = %e, path = %job.output_path.display(), "Failed to remove partial export");
            }
        }
        outcome
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument vector for `job`.
pub fn build_ffmpeg_args(job: &ExportJob) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ];

    match &job.composition {
        Some(composition) => {
            // The track transform already carries the rotation correction.
            args.push("-noautorotate".to_string());
            args.push("-i".to_string());
            args.push(job.source.display().to_string());

            if let Some(image) = composition.overlay_image() {
                args.push("-loop".to_string());
                args.push("1".to_string());
                args.push("-i".to_string());
                args.push(image.display().to_string());
            }

            let output_size = job.preset.constrain(composition.render_size);
            args.push("-filter_complex".to_string());
            args.push(build_filter_graph(composition, output_size));
            args.push("-map".to_string());
            args.push("[vout]".to_string());
        }
        None => {
            args.push("-i".to_string());
            args.push(job.source.display().to_string());
            args.push("-map".to_string());
            args.push("0:v:0".to_string());
            args.push("-vf".to_string());
            args.push("scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string());
        }
    }

    if job.has_audio {
        args.push("-map".to_string());
        args.push("0:a:0?".to_string());
    }

    if let Some(fps) = job.frame_rate {
        args.push("-r".to_string());
        args.push(fps.max(1).to_string());
    }
    if job.duration_secs > 0.0 {
        args.push("-t".to_string());
        args.push(format!("{:.6}", job.duration_secs));
    }

    args.append(&mut codec_args(job));
    args.push(job.output_path.display().to_string());
    args
}

/// Filter graph implementing the composition's layer stack.
///
/// Produces a single `[vout]` stream of `output_size`.
pub fn build_filter_graph(composition: &Composition, output_size: Dimensions) -> String {
    let fps = composition.frame_rate;
    let duration = composition.duration_secs;
    let (render_w, render_h) = composition.render_size.to_even_pixels();
    let placement = &composition.video.placement;

    let mut graph = format!(
        "color=c=black:s={render_w}x{render_h}:r={fps}:d={duration:.6}[frame];\
         [0:v]{rotate}scale={track_w}:{track_h},setsar=1[track];\
         [frame][track]overlay=x={x}:y={y}:shortest=1[rendered]",
        rotate = rotation_filter(placement),
        track_w = placement.width,
        track_h = placement.height,
        x = placement.x,
        y = placement.y,
    );

    let video_frame = composition
        .layer(|k| matches!(k, LayerKind::Video))
        .map(|l| l.frame.size())
        .unwrap_or(composition.render_size);
    let (video_w, video_h) = video_frame.to_even_pixels();
    let background = composition
        .layer(|k| matches!(k, LayerKind::Background))
        .map(|l| l.frame.size())
        .unwrap_or(composition.render_size);
    let (bg_w, bg_h) = background.to_even_pixels();

    graph.push_str(&format!(
        ";[rendered]scale={video_w}:{video_h},setsar=1[video];\
         color=c=black:s={bg_w}x{bg_h}:r={fps}:d={duration:.6}[background];\
         [background][video]overlay=x=0:y=0:shortest=1[scene]"
    ));

    let overlay = composition.layers.iter().find_map(|layer| match &layer.kind {
        LayerKind::Overlay { .. } => Some(layer.frame),
        _ => None,
    });
    match overlay {
        Some(frame) => {
            let (ow, oh) = frame.size().to_even_pixels();
            graph.push_str(&format!(
                ";[1:v]scale={ow}:{oh}:force_original_aspect_ratio=increase,crop={ow}:{oh},format=rgba[overlay];\
                 [scene][overlay]overlay=x=0:y=0:shortest=1[composited]"
            ));
        }
        None => graph.push_str(";[scene]null[composited]"),
    }

    let (out_w, out_h) = output_size.to_even_pixels();
    if (out_w, out_h) == (bg_w, bg_h) {
        graph.push_str(";[composited]format=yuv420p[vout]");
    } else {
        graph.push_str(&format!(
            ";[composited]scale={out_w}:{out_h}:flags=lanczos,format=yuv420p[vout]"
        ));
    }

    graph
}

fn rotation_filter(placement: &VideoPlacement) -> &'static str {
    match placement.quarter_turns % 4 {
        0 => "",
        1 => "transpose=clock,",
        2 => "hflip,vflip,",
        _ => "transpose=cclock,",
    }
}

fn codec_args(job: &ExportJob) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        job.preset.x264_preset().to_string(),
        "-crf".to_string(),
        job.preset.x264_crf().to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];

    if job.has_audio {
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-b:a".to_string());
        args.push(format!("{}k", job.preset.audio_bitrate_kbps()));
    }

    if job.optimize_for_network {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }

    if job.byte_limit > 0 {
        args.push("-fs".to_string());
        args.push(job.byte_limit.to_string());
    }

    args.push("-f".to_string());
    args.push("mov".to_string());
    args
}

fn failure_detail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn command_exists(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {} >/dev/null 2>&1", binary.display()))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Encoding
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{AudioTrack, Layer, VideoTrack};
    use reframe_layout::{AffineTransform, Rect};

    fn composition(canvas: Dimensions, video: Rect, overlay: Option<&str>) -> Composition {
        let mut layers = vec![
            Layer {
                kind: LayerKind::Background,
                frame: Rect::from_size(canvas),
            },
            Layer {
                kind: LayerKind::Video,
                frame: video,
            },
        ];
        if let Some(image) = overlay {
            layers.push(Layer {
                kind: LayerKind::Overlay {
                    image: PathBuf::from(image),
                },
                frame: Rect::from_size(canvas),
            });
        }

        Composition {
            source: PathBuf::from("in.mov"),
            duration_secs: 10.0,
            frame_rate: 30,
            render_size: canvas,
            video: VideoTrack {
                natural_size: Dimensions::new(1920.0, 1080.0),
                transform: AffineTransform::IDENTITY,
                placement: VideoPlacement {
                    quarter_turns: 1,
                    width: 720,
                    height: 640,
                    x: 0,
                    y: 320,
                },
            },
            audio: Some(AudioTrack { stream_index: 0 }),
            layers,
        }
    }

    fn job(composition: Option<Composition>, byte_limit: u64, has_audio: bool) -> ExportJob {
        ExportJob {
            source: PathBuf::from("in.mov"),
            output_path: PathBuf::from("/tmp/out.mov"),
            composition,
            preset: ExportPreset::Hd720,
            frame_rate: Some(30),
            duration_secs: 10.0,
            has_audio,
            byte_limit,
            optimize_for_network: true,
        }
    }

    #[test]
    fn test_byte_budget() {
        let budget = ByteBudget::new(0.4);
        assert_eq!(budget.limit_for(10.0), 4 * BYTES_PER_MIB);
        assert_eq!(budget.limit_for(12.9), 5 * BYTES_PER_MIB);
        assert_eq!(budget.limit_for(2.0), 0);
        assert_eq!(budget.limit_for(f64::NAN), 0);
        assert_eq!(budget.limit_for(-3.0), 0);
    }

    #[test]
    fn test_hd720_constrains_both_orientations() {
        let portrait = ExportPreset::Hd720.constrain(Dimensions::new(1080.0, 1920.0));
        assert!((portrait.width - 720.0).abs() < 1e-9);
        assert!((portrait.height - 1280.0).abs() < 1e-9);

        let landscape = ExportPreset::Hd720.constrain(Dimensions::new(3840.0, 2160.0));
        assert!((landscape.width - 1280.0).abs() < 1e-9);
        assert!((landscape.height - 720.0).abs() < 1e-9);

        let small = Dimensions::new(480.0, 640.0);
        assert_eq!(ExportPreset::Hd720.constrain(small), small);
        let big = Dimensions::new(2160.0, 3840.0);
        assert_eq!(ExportPreset::Highest.constrain(big), big);
    }

    #[test]
    fn test_filter_graph_landscape_with_overlay() {
        let canvas = Dimensions::new(720.0, 1280.0);
        let comp = composition(canvas, Rect::from_size(canvas), Some("overlay.png"));
        let graph = build_filter_graph(&comp, canvas);

        assert!(graph.starts_with("color=c=black:s=720x1280:r=30:d=10.000000[frame]"));
        assert!(graph.contains("[0:v]transpose=clock,scale=720:640,setsar=1[track]"));
        assert!(graph.contains("[frame][track]overlay=x=0:y=320:shortest=1[rendered]"));
        assert!(graph.contains("[1:v]scale=720:1280:force_original_aspect_ratio=increase,crop=720:1280"));
        assert!(graph.ends_with(";[composited]format=yuv420p[vout]"));
    }

    #[test]
    fn test_filter_graph_downscales_to_output() {
        let canvas = Dimensions::new(1080.0, 1920.0);
        let comp = composition(canvas, Rect::from_size(canvas), None);
        let output = ExportPreset::Hd720.constrain(canvas);
        let graph = build_filter_graph(&comp, output);

        assert!(graph.contains("[scene]null[composited]"));
        assert!(graph.ends_with("scale=720:1280:flags=lanczos,format=yuv420p[vout]"));
        assert!(!graph.contains("[1:v]"));
    }

    #[test]
    fn test_args_for_composition() {
        let canvas = Dimensions::new(720.0, 1280.0);
        let comp = composition(canvas, Rect::from_size(canvas), Some("overlay.png"));
        let args = build_ffmpeg_args(&job(Some(comp), 4 * BYTES_PER_MIB, true));

        let noautorotate = args.iter().position(|a| a == "-noautorotate").unwrap();
        let first_input = args.iter().position(|a| a == "-i").unwrap();
        assert!(noautorotate < first_input);
        assert!(args.windows(2).any(|w| w[0] == "-loop" && w[1] == "1"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[vout]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a:0?"));
        assert!(args.windows(2).any(|w| w[0] == "-fs" && w[1] == "4194304"));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "mov"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mov"));
    }

    #[test]
    fn test_args_without_limit_or_audio() {
        let args = build_ffmpeg_args(&job(None, 0, false));
        assert!(!args.iter().any(|a| a == "-fs"));
        assert!(!args.iter().any(|a| a == "0:a:0?"));
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert!(!args.iter().any(|a| a == "-noautorotate"));
        assert!(args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn test_progress_state_parsing() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "5000000");
        let report = progress_report(&state, 10.0, 2.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 2.0).abs() < 1e-9);
        assert_eq!(report.stage, ExportStage::Encoding);

        state.update("progress", "end");
        let done = progress_report(&state, 10.0, 4.0);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.stage, ExportStage::Finalizing);
    }

    #[test]
    fn test_failure_detail_never_empty() {
        assert_eq!(failure_detail("  \n"), "unknown error");
        assert_eq!(failure_detail("Invalid data\n"), "Invalid data");
    }

    #[test]
    fn test_missing_ffmpeg_reports_failure() {
        let backend = FfmpegBackend::new("/nonexistent/reframe-ffmpeg");
        assert!(!backend.is_available());
        let outcome = backend.export(&job(None, 0, false), None);
        assert_eq!(outcome.status, ExportStatus::Failed);
        assert!(outcome.error.is_some_and(|e| !e.is_empty()));
    }
}
