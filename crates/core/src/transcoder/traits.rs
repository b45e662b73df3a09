//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::TranscoderError;
use super::types::{TranscodeJob, TranscodeProgress, TranscodeResult};

/// A transcoder that re-encodes a file to a target codec pair.
///
/// On success the input file is removed and the returned result points at the
/// new file. On failure the input file is left untouched.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Transcodes a file with progress reporting.
    ///
    /// The progress sender will receive updates during the transcode.
    /// If the receiver is dropped, the transcode continues without progress reporting.
    /// Cancelling the token stops the underlying process and yields
    /// [`TranscoderError::Cancelled`].
    async fn transcode(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
        cancel: CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscoderError>;
}
