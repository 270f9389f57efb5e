//! Fake media services shared by the editor test binaries.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reframe_common::config::AppConfig;
use reframe_common::error::{ExportStatus, ReframeError, ReframeResult};
use reframe_layout::{Dimensions, PreviewGeometry, Rect, ReferenceFrameSource};
use reframe_render_engine::{
    ExportEngine, ExportJob, ExportOutcome, MediaInfo, MediaProbe, ProgressCallback,
    RenderRequest, SnapshotProvider, VideoEditor,
};
use tempfile::TempDir;

pub struct FakeProbe(pub MediaInfo);

impl MediaProbe for FakeProbe {
    fn probe(&self, _path: &Path) -> ReframeResult<MediaInfo> {
        Ok(self.0.clone())
    }
}

pub struct FakeFrames(pub Option<Dimensions>);

impl ReferenceFrameSource for FakeFrames {
    fn reference_frame_size(&self, _source: &Path) -> ReframeResult<Dimensions> {
        self.0
            .ok_or_else(|| ReframeError::frame_extraction("no decodable frames"))
    }
}

pub struct FailingSnapshot;

impl SnapshotProvider for FailingSnapshot {
    fn snapshot(&self) -> ReframeResult<PathBuf> {
        Err(ReframeError::resource("view is not laid out"))
    }
}

pub struct StaticSnapshot(pub PathBuf);

impl SnapshotProvider for StaticSnapshot {
    fn snapshot(&self) -> ReframeResult<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Records every job and answers with a fixed outcome.
pub struct RecordingEngine {
    outcome: ExportOutcome,
    pub jobs: Mutex<Vec<ExportJob>>,
}

impl RecordingEngine {
    pub fn new(outcome: ExportOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            jobs: Mutex::new(Vec::new()),
        })
    }

    pub fn last_job(&self) -> ExportJob {
        self.jobs.lock().unwrap().last().cloned().unwrap()
    }
}

impl ExportEngine for RecordingEngine {
    fn export(&self, job: &ExportJob, _progress: Option<ProgressCallback>) -> ExportOutcome {
        if self.outcome.status == ExportStatus::Completed {
            std::fs::write(&job.output_path, b"encoded").unwrap();
        }
        self.jobs.lock().unwrap().push(job.clone());
        self.outcome.clone()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn media(natural: Dimensions, rotation: u16, duration: f64) -> MediaInfo {
    MediaInfo {
        duration_secs: duration,
        natural_size: natural,
        rotation_cw_degrees: rotation,
        has_audio: true,
        video_codec: "h264".to_string(),
        file_size_bytes: 4_000_000,
    }
}

pub fn config(output_dir: &Path) -> AppConfig {
    AppConfig {
        output_dir: Some(output_dir.to_path_buf()),
        ..AppConfig::default()
    }
}

/// Editor writing into a fresh temp dir; keep the dir alive for the test.
pub fn editor(
    info: MediaInfo,
    frame: Option<Dimensions>,
    engine: Arc<RecordingEngine>,
) -> (TempDir, VideoEditor) {
    let dir = tempfile::tempdir().unwrap();
    let editor = VideoEditor::with_services(
        config(dir.path()),
        Arc::new(FakeProbe(info)),
        Arc::new(FakeFrames(frame)),
        engine,
    )
    .unwrap();
    (dir, editor)
}

pub fn request(portrait: bool, preview_height: f64, viewport_height: f64) -> RenderRequest {
    RenderRequest {
        source: PathBuf::from("/videos/clip.mov"),
        portrait,
        overlay: None,
        filter_enabled: false,
        preview: PreviewGeometry {
            frame: Rect::new(0.0, 100.0, 390.0, preview_height),
            viewport_height,
        },
    }
}
