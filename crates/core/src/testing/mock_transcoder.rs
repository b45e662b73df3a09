//! Mock transcoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::transcoder::{
    TranscodeJob, TranscodeProgress, TranscodeResult, Transcoder, TranscoderError,
};

/// A recorded transcode job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The job that was submitted.
    pub job: TranscodeJob,
    /// Whether the transcode succeeded.
    pub success: bool,
}

/// Mock implementation of the Transcoder trait.
///
/// Follows the real transcoder's file contract: on success it writes
/// `<stem>_converted.mp4` next to the input and removes the input; on
/// failure or cancellation the input is left untouched.
#[derive(Debug, Clone)]
pub struct MockTranscoder {
    /// Recorded transcodes.
    transcodes: Arc<RwLock<Vec<RecordedTranscode>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TranscoderError>>>,
    /// Frame counts reported, in order.
    frames: Arc<RwLock<Vec<u64>>>,
    /// Total frame count reported with each update.
    total_frames: Arc<RwLock<Option<u64>>>,
    /// Delay before each progress update.
    step_delay_ms: Arc<RwLock<u64>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self {
            transcodes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            frames: Arc::new(RwLock::new(vec![250, 500, 750, 1000])),
            total_frames: Arc::new(RwLock::new(Some(1000))),
            step_delay_ms: Arc::new(RwLock::new(0)),
        }
    }

    /// Get all recorded transcodes.
    pub async fn recorded_transcodes(&self) -> Vec<RecordedTranscode> {
        self.transcodes.read().await.clone()
    }

    /// Get the number of transcodes attempted.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TranscoderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the frames reported during a transcode and the total.
    pub async fn set_frames(&self, frames: Vec<u64>, total: Option<u64>) {
        *self.frames.write().await = frames;
        *self.total_frames.write().await = total;
    }

    /// Set the delay before each progress update.
    pub async fn set_step_delay(&self, delay: Duration) {
        *self.step_delay_ms.write().await = delay.as_millis() as u64;
    }

    async fn take_error(&self) -> Option<TranscoderError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, job: TranscodeJob, success: bool) {
        self.transcodes
            .write()
            .await
            .push(RecordedTranscode { job, success });
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
        cancel: CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        if let Some(err) = self.take_error().await {
            self.record(job, false).await;
            return Err(err);
        }
        if !job.input_path.exists() {
            let path = job.input_path.clone();
            self.record(job, false).await;
            return Err(TranscoderError::InputNotFound { path });
        }

        let frames = self.frames.read().await.clone();
        let total_frames = *self.total_frames.read().await;
        let delay = Duration::from_millis(*self.step_delay_ms.read().await);

        for frame in frames {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.record(job, false).await;
                    return Err(TranscoderError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            let _ = progress_tx
                .send(TranscodeProgress {
                    job_id: job.job_id.clone(),
                    frame,
                    total_frames,
                    percent: crate::transcoder::progress::frame_percent(frame, total_frames),
                })
                .await;
        }

        let stem = job
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let output_path = job
            .input_path
            .with_file_name(format!("{}_converted.mp4", stem));

        tokio::fs::write(&output_path, b"mock converted data").await?;
        tokio::fs::remove_file(&job.input_path).await?;

        let result = TranscodeResult {
            job_id: job.job_id.clone(),
            output_size_bytes: tokio::fs::metadata(&output_path).await?.len(),
            output_path,
            duration_ms: 0,
            video_encoder: job.video_codec.software_encoder().to_string(),
        };
        self.record(job, true).await;
        Ok(result)
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
