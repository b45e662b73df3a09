//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching remote media.
#[derive(Debug, Error)]
pub enum FetcherError {
    /// yt-dlp binary not found.
    #[error("yt-dlp not found at path: {path}")]
    YtDlpNotFound { path: PathBuf },

    /// The download process failed (network, extraction, unavailable media).
    #[error("Download failed: {reason}")]
    DownloadFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Metadata could not be queried after the download.
    #[error("Failed to query media metadata: {reason}")]
    MetadataFailed { reason: String },

    /// The downloaded file could not be located on disk.
    #[error("Downloaded file not found: {path}")]
    OutputNotFound { path: PathBuf },

    /// I/O error during the fetch.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetch was cancelled.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetcherError {
    /// Creates a new download failed error with stderr output.
    pub fn download_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::DownloadFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new metadata failed error.
    pub fn metadata_failed(reason: impl Into<String>) -> Self {
        Self::MetadataFailed {
            reason: reason.into(),
        }
    }

    /// Whether this error came from a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetcherError::download_failed(
            "yt-dlp exited with code: Some(1)",
            Some("ERROR: Video unavailable".to_string()),
        );
        assert_eq!(err.to_string(), "Download failed: yt-dlp exited with code: Some(1)");
        assert!(!err.is_cancelled());
        assert!(FetcherError::Cancelled.is_cancelled());
    }
}
