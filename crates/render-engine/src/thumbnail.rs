//! Reference frame extraction.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_layout::{Dimensions, ReferenceFrameSource};

use crate::probe::probe_frame_dimensions;

/// Decodes the first frame of a video with ffmpeg.
///
/// ffmpeg applies rotation metadata while decoding, so the extracted
/// frame has the upright visual shape.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    scratch_dir: PathBuf,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn extract_to(&self, source: &Path, frame_path: &Path) -> ReframeResult<()> {
        let output = Command::new(&self.ffmpeg)
            .args(reference_frame_args(source, frame_path))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReframeError::frame_extraction(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(ReframeError::frame_extraction(format!(
                "ffmpeg could not decode a frame from {}: {}",
                source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !frame_path.exists() {
            return Err(ReframeError::frame_extraction(format!(
                "{} has no decodable frames",
                source.display()
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl ReferenceFrameSource for FfmpegFrameExtractor {
    fn reference_frame_size(&self, source: &Path) -> ReframeResult<Dimensions> {
        let frame_path = self
            .scratch_dir
            .join(format!("reframe-ref-{}.png", uuid::Uuid::new_v4()));

        let result = self
            .extract_to(source, &frame_path)
            .and_then(|()| probe_frame_dimensions(&self.ffprobe, &frame_path));

        if frame_path.exists() {
            if let Err(err) = std::fs::remove_file(&frame_path) {
                tracing::warn!(error = %err, path = %frame_path.display(), "Failed to remove reference frame");
            }
        }
        result
    }
}

/// Arguments that decode the frame at time zero into a single image.
fn reference_frame_args(source: &Path, frame_path: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        "0".to_string(),
        "-i".to_string(),
        source.display().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-an".to_string(),
        frame_path.display().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frame_args_keep_autorotate() {
        let args = reference_frame_args(Path::new("in.mov"), Path::new("/tmp/f.png"));
        assert!(!args.iter().any(|a| a == "-noautorotate"));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must precede the input");
        assert_eq!(args.last().map(String::as_str), Some("/tmp/f.png"));
    }

    #[test]
    fn test_missing_binary_is_extraction_error() {
        let scratch = tempfile::tempdir().unwrap();
        let extractor = FfmpegFrameExtractor::new(
            "/nonexistent/reframe-ffmpeg",
            "/nonexistent/reframe-ffprobe",
        )
        .with_scratch_dir(scratch.path());
        let err = extractor
            .reference_frame_size(Path::new("clip.mov"))
            .unwrap_err();
        assert!(matches!(err, ReframeError::FrameExtraction { .. }));
    }
}
