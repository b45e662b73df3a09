//! Mock fetcher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{FetchJob, FetchOutput, FetchProgress, Fetcher, FetcherError, FormatSelector};

/// Mock implementation of the Fetcher trait.
///
/// Writes a real file into the job's destination directory so the rest of
/// the pipeline can operate on it:
/// - Records fetch jobs for assertions
/// - Simulates failure via [`set_next_error`](Self::set_next_error)
/// - Emits configurable progress steps, optionally slowed down so tests
///   can cancel mid-fetch
#[derive(Debug, Clone)]
pub struct MockFetcher {
    /// Recorded fetch jobs.
    fetches: Arc<RwLock<Vec<FetchJob>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetcherError>>>,
    /// Percentages reported, in order.
    progress_steps: Arc<RwLock<Vec<f32>>>,
    /// Delay before each progress step.
    step_delay_ms: Arc<RwLock<u64>>,
    /// Stem of the written file.
    title: Arc<RwLock<String>>,
    /// Extension used for muxed video downloads.
    video_extension: Arc<RwLock<String>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            progress_steps: Arc::new(RwLock::new(vec![25.0, 50.0, 75.0, 100.0])),
            step_delay_ms: Arc::new(RwLock::new(0)),
            title: Arc::new(RwLock::new("video123".to_string())),
            video_extension: Arc::new(RwLock::new("mp4".to_string())),
        }
    }

    /// Get all recorded fetch jobs.
    pub async fn recorded_fetches(&self) -> Vec<FetchJob> {
        self.fetches.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetcherError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the percentages reported during a fetch.
    pub async fn set_progress_steps(&self, steps: Vec<f32>) {
        *self.progress_steps.write().await = steps;
    }

    /// Set the delay before each progress step.
    pub async fn set_step_delay(&self, delay: Duration) {
        *self.step_delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Set the stem of the written file.
    pub async fn set_title(&self, title: impl Into<String>) {
        *self.title.write().await = title.into();
    }

    /// Set the extension of muxed video downloads.
    pub async fn set_video_extension(&self, ext: impl Into<String>) {
        *self.video_extension.write().await = ext.into();
    }

    async fn take_error(&self) -> Option<FetcherError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        job: &FetchJob,
        progress_tx: mpsc::Sender<FetchProgress>,
        cancel: CancellationToken,
    ) -> Result<FetchOutput, FetcherError> {
        self.fetches.write().await.push(job.clone());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let steps = self.progress_steps.read().await.clone();
        let delay = Duration::from_millis(*self.step_delay_ms.read().await);

        for percent in steps {
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetcherError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            let _ = progress_tx
                .send(FetchProgress {
                    job_id: job.job_id.clone(),
                    percent,
                })
                .await;
        }

        if cancel.is_cancelled() {
            return Err(FetcherError::Cancelled);
        }

        let ext = match job.format {
            FormatSelector::AudioOnly => "mp3".to_string(),
            FormatSelector::MuxedVideo => self.video_extension.read().await.clone(),
        };
        let title = self.title.read().await.clone();
        let file_path = job.dest_dir.join(format!("{}.{}", title, ext));
        tokio::fs::write(&file_path, b"mock media data").await?;

        Ok(FetchOutput {
            job_id: job.job_id.clone(),
            size_bytes: tokio::fs::metadata(&file_path).await?.len(),
            file_path,
            title: Some(title),
            duration_ms: 0,
        })
    }

    async fn validate(&self) -> Result<(), FetcherError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
