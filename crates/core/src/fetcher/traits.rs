//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::FetcherError;
use super::types::{FetchJob, FetchOutput, FetchProgress};

/// A fetcher that retrieves remote media into a destination directory.
///
/// Implementations clean up their own transient files on every exit path.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads the media described by `job`, reporting byte progress.
    ///
    /// Returns the path of the file actually written, never a template.
    /// Cancelling the token stops the download and yields [`FetcherError::Cancelled`].
    async fn fetch(
        &self,
        job: &FetchJob,
        progress_tx: mpsc::Sender<FetchProgress>,
        cancel: CancellationToken,
    ) -> Result<FetchOutput, FetcherError>;

    /// Validates that the fetcher is properly configured and ready.
    async fn validate(&self) -> Result<(), FetcherError>;
}
