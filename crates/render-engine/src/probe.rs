//! Source media probing via ffprobe.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_layout::{AffineTransform, Dimensions};

/// What the pipeline needs to know about a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    /// Declared size of the first video stream, before rotation.
    pub natural_size: Dimensions,
    /// Clockwise rotation needed to display upright: 0, 90, 180 or 270.
    pub rotation_cw_degrees: u16,
    pub has_audio: bool,
    pub video_codec: String,
    pub file_size_bytes: u64,
}

impl MediaInfo {
    /// The track's upright-correction transform.
    pub fn intrinsic_transform(&self) -> AffineTransform {
        AffineTransform::quarter_turn((self.rotation_cw_degrees / 90) as u8, self.natural_size)
    }
}

/// Reads container and stream metadata.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> ReframeResult<MediaInfo>;
}

/// `MediaProbe` backed by the ffprobe binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe: PathBuf,
}

impl FfprobeProbe {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ReframeResult<MediaInfo> {
        if !path.exists() {
            return Err(ReframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReframeError::resource(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ReframeError::resource(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = parse_ffprobe_output(&output.stdout)?;
        tracing::debug!(
            path = %path.display(),
            duration_secs = info.duration_secs,
            width = info.natural_size.width,
            height = info.natural_size.height,
            rotation = info.rotation_cw_degrees,
            has_audio = info.has_audio,
            "Probed source"
        );
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    tags: Option<FfprobeTags>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_ffprobe_output(json: &[u8]) -> ReframeResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReframeError::resource("Source has no video track"))?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let file_size_bytes = probe
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(MediaInfo {
        duration_secs,
        natural_size: Dimensions::from_pixels(video.width.unwrap_or(0), video.height.unwrap_or(0)),
        rotation_cw_degrees: stream_rotation_cw(video),
        has_audio,
        video_codec: video.codec_name.clone().unwrap_or_default(),
        file_size_bytes,
    })
}

/// Display-matrix rotation is counter-clockwise; the legacy `rotate` tag is
/// clockwise. Both are snapped to the nearest quarter turn.
fn stream_rotation_cw(stream: &FfprobeStream) -> u16 {
    let from_side_data = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .map(|ccw| -ccw);
    let from_tags = stream
        .tags
        .as_ref()
        .and_then(|t| t.rotate.as_deref())
        .and_then(|r| r.trim().parse::<f64>().ok());

    from_side_data
        .or(from_tags)
        .map(normalize_rotation)
        .unwrap_or(0)
}

fn normalize_rotation(degrees: f64) -> u16 {
    if !degrees.is_finite() {
        return 0;
    }
    let turns = (degrees / 90.0).round() as i64;
    (turns.rem_euclid(4) * 90) as u16
}

/// Pixel size of the first video stream (or image) in `path`.
pub fn probe_frame_dimensions(ffprobe: &Path, path: &Path) -> ReframeResult<Dimensions> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ReframeError::frame_extraction(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(ReframeError::frame_extraction(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_dimensions_csv(&raw).ok_or_else(|| {
        ReframeError::frame_extraction(format!("Unexpected ffprobe output: {}", raw.trim()))
    })
}

fn parse_dimensions_csv(raw: &str) -> Option<Dimensions> {
    let line = raw.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let width = w.trim().parse::<u32>().ok()?;
    let height = h.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Dimensions::from_pixels(width, height))
}
