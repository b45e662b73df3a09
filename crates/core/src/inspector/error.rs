//! Error types for the inspector module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing a media file.
#[derive(Debug, Error)]
pub enum InspectorError {
    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// File to inspect does not exist.
    #[error("Media file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The prober rejected the file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse prober output.
    #[error("Failed to parse stream info: {reason}")]
    ParseError { reason: String },

    /// I/O error while running the prober.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectorError {
    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }
}
