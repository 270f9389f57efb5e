//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ReframeError, ReframeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for rendered files. `None` uses the system temp dir.
    pub output_dir: Option<PathBuf>,

    /// Size, frame-rate, and byte-budget policy for exports.
    pub render: RenderPolicy,

    /// External tool locations.
    pub tools: ToolPaths,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Export policy applied to every render request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPolicy {
    /// Fixed canvas for non-portrait renders (pixels).
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Output frame rate.
    pub frame_rate: u32,

    /// Container file extension, without the dot.
    pub container_extension: String,

    /// Output size budget in MiB per second of source duration.
    pub byte_budget_mib_per_sec: f64,

    /// Height of the preview viewport (device-independent units) used when
    /// the caller does not supply one.
    pub preview_viewport_height: f64,

    /// Move the index to the front of the file for progressive playback.
    pub optimize_for_network: bool,
}

/// Locations of the external media tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            render: RenderPolicy::default(),
            tools: ToolPaths::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            canvas_width: 720,
            canvas_height: 1280,
            frame_rate: 30,
            container_extension: "mov".to_string(),
            byte_budget_mib_per_sec: 0.4,
            preview_viewport_height: 844.0,
            optimize_for_network: true,
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RenderPolicy {
    /// Reject policies the layout math cannot work with.
    pub fn validate(&self) -> ReframeResult<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ReframeError::config(format!(
                "Canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.frame_rate == 0 {
            return Err(ReframeError::config("Frame rate must be positive"));
        }
        if !self.byte_budget_mib_per_sec.is_finite() || self.byte_budget_mib_per_sec < 0.0 {
            return Err(ReframeError::config(
                "Byte budget must be a non-negative number",
            ));
        }
        if !(self.preview_viewport_height > 0.0) {
            return Err(ReframeError::config(
                "Preview viewport height must be positive",
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.render.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring invalid config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Directory rendered files are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reframe").join("config.json")
}
