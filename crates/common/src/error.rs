//! Error types shared across Reframe crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Terminal status reported by an export engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
            ExportStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Top-level error type for Reframe operations.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    /// Source asset is unreadable or lacks a required track.
    #[error("Resource error: {message}")]
    Resource { message: String },

    /// The composition could not be assembled from the source tracks.
    #[error("Composition error: {message}")]
    Composition { message: String },

    /// The export engine finished with a non-completed status.
    #[error("Export {status}: {message}")]
    Export {
        status: ExportStatus,
        message: String,
    },

    /// No reference frame could be decoded. Orientation inference
    /// degrades this to a default instead of aborting.
    #[error("Reference frame extraction failed: {message}")]
    FrameExtraction { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReframeError.
pub type ReframeResult<T> = Result<T, ReframeError>;

impl ReframeError {
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition {
            message: msg.into(),
        }
    }

    pub fn export(status: ExportStatus, msg: impl Into<String>) -> Self {
        Self::Export {
            status,
            message: msg.into(),
        }
    }

    pub fn frame_extraction(msg: impl Into<String>) -> Self {
        Self::FrameExtraction {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
