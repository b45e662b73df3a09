//! Pipeline orchestrator implementation.

use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::fetcher::{FetchJob, FetchProgress, Fetcher, FetcherError, FormatSelector};
use crate::inspector::CodecInspector;
use crate::transcoder::{TranscodeJob, TranscodeProgress, Transcoder, TranscoderError};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::policy::CodecPolicy;
use super::progress::{ActiveEntry, ActiveMap, ProgressCallback, ProgressEmitter};
use super::types::{
    ActiveRequest, DownloadRequest, FailureReason, OrchestratorStatus, Phase, PipelineResult,
    ProgressEvent,
};

/// Observer invoked once with every request's terminal result.
pub type ResultCallback = Arc<dyn Fn(&PipelineResult) + Send + Sync>;

/// Handle to a submitted request.
///
/// Dropping `events` while the request is running cancels it. Callers that
/// only care about the outcome should use [`RequestHandle::wait`], which
/// drains the events for them.
pub struct RequestHandle {
    request_id: String,
    /// Ordered progress events for this request.
    pub events: mpsc::Receiver<ProgressEvent>,
    /// Delivers exactly one result.
    pub result: oneshot::Receiver<PipelineResult>,
    cancel: CancellationToken,
}

impl RequestHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Requests cancellation. The result still arrives, as
    /// `Failure(CancelledByCaller)` unless the request already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the result, discarding progress events.
    pub async fn wait(self) -> Result<PipelineResult, PipelineError> {
        self.wait_with(|_| {}).await
    }

    /// Waits for the result, passing every progress event to `on_event`.
    pub async fn wait_with(
        mut self,
        mut on_event: impl FnMut(&ProgressEvent),
    ) -> Result<PipelineResult, PipelineError> {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        let request_id = self.request_id;
        self.result
            .await
            .map_err(|_| PipelineError::ResultDropped(request_id))
    }
}

/// Runs requests through fetch, inspection and conditional transcoding.
///
/// Each submitted request runs on its own task. The only state shared
/// between requests is the map of active requests used for status and
/// cancellation.
pub struct PipelineOrchestrator<F: Fetcher, I: CodecInspector, T: Transcoder> {
    config: PipelineConfig,
    policy: CodecPolicy,
    fetcher: Arc<F>,
    inspector: Arc<I>,
    transcoder: Arc<T>,
    active: ActiveMap,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl<F, I, T> PipelineOrchestrator<F, I, T>
where
    F: Fetcher + 'static,
    I: CodecInspector + 'static,
    T: Transcoder + 'static,
{
    /// Creates a new orchestrator.
    pub fn new(
        config: PipelineConfig,
        policy: CodecPolicy,
        fetcher: F,
        inspector: I,
        transcoder: T,
    ) -> Self {
        Self {
            config,
            policy,
            fetcher: Arc::new(fetcher),
            inspector: Arc::new(inspector),
            transcoder: Arc::new(transcoder),
            active: Arc::new(RwLock::new(HashMap::new())),
            progress_callback: None,
            result_callback: None,
        }
    }

    /// Sets an observer for the progress of every request.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Sets an observer for the result of every request.
    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn policy(&self) -> CodecPolicy {
        self.policy
    }

    /// Checks that every subsystem is ready.
    pub async fn validate(&self) -> Result<(), PipelineError> {
        self.fetcher.validate().await?;
        self.inspector.validate().await?;
        self.transcoder.validate().await?;
        Ok(())
    }

    /// Submits a request from raw caller input.
    ///
    /// `format` accepts `audio`/`video` and the aliases `mp3`/`mp4`.
    pub async fn submit(
        &self,
        url: &str,
        dest_dir: impl AsRef<Path>,
        format: &str,
    ) -> Result<RequestHandle, PipelineError> {
        let format = format
            .parse::<FormatSelector>()
            .map_err(|e| PipelineError::configuration(e.to_string()))?;
        self.submit_request(DownloadRequest::new(url, dest_dir.as_ref(), format))
            .await
    }

    /// Validates and starts a request.
    ///
    /// Returns immediately after spawning the request task. Rejected
    /// requests produce no events and no result.
    pub async fn submit_request(
        &self,
        request: DownloadRequest,
    ) -> Result<RequestHandle, PipelineError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(PipelineError::configuration("source URL is empty"));
        }
        ensure_destination(&request.dest_dir).await?;

        let request = DownloadRequest {
            url: url.to_string(),
            ..request
        };
        let request_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (result_tx, result_rx) = oneshot::channel();

        self.active.write().await.insert(
            request_id.clone(),
            ActiveEntry {
                info: ActiveRequest {
                    request_id: request_id.clone(),
                    url: request.url.clone(),
                    format: request.format,
                    phase: Phase::Fetching,
                    started_at: Utc::now(),
                },
                cancel: cancel.clone(),
            },
        );

        info!(
            request_id = %request_id,
            url = %request.url,
            format = %request.format,
            dest = %request.dest_dir.display(),
            "Request accepted"
        );

        let emitter = ProgressEmitter::new(
            request_id.clone(),
            events_tx,
            self.progress_callback.clone(),
            Arc::clone(&self.active),
            cancel.clone(),
        );
        let task = RequestTask {
            request_id: request_id.clone(),
            request,
            policy: self.policy,
            channel_capacity: self.config.subsystem_channel_capacity.max(1),
            fetcher: Arc::clone(&self.fetcher),
            inspector: Arc::clone(&self.inspector),
            transcoder: Arc::clone(&self.transcoder),
            cancel: cancel.clone(),
        };
        let result_callback = self.result_callback.clone();

        tokio::spawn(async move {
            let result = task.run(emitter).await;
            if let Some(callback) = &result_callback {
                callback(&result);
            }
            let _ = result_tx.send(result);
        });

        Ok(RequestHandle {
            request_id,
            events: events_rx,
            result: result_rx,
            cancel,
        })
    }

    /// Returns the active requests, oldest first.
    pub async fn status(&self) -> OrchestratorStatus {
        let active = self.active.read().await;
        let mut requests: Vec<ActiveRequest> = active.values().map(|e| e.info.clone()).collect();
        requests.sort_by_key(|r| r.started_at);
        OrchestratorStatus { active: requests }
    }

    /// Cancels an active request.
    pub async fn cancel(&self, request_id: &str) -> Result<(), PipelineError> {
        let active = self.active.read().await;
        let entry = active
            .get(request_id)
            .ok_or_else(|| PipelineError::RequestNotFound(request_id.to_string()))?;
        entry.cancel.cancel();
        info!(request_id = %request_id, "Cancellation requested");
        Ok(())
    }

    /// Cancels every active request, returning how many were signalled.
    pub async fn cancel_all(&self) -> usize {
        let active = self.active.read().await;
        for entry in active.values() {
            entry.cancel.cancel();
        }
        if !active.is_empty() {
            info!(count = active.len(), "Cancelling all active requests");
        }
        active.len()
    }
}

/// Checks that the destination is a directory, creating it if missing.
async fn ensure_destination(dest_dir: &Path) -> Result<(), PipelineError> {
    match tokio::fs::metadata(dest_dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(PipelineError::configuration(format!(
            "destination is not a directory: {}",
            dest_dir.display()
        ))),
        Err(_) => tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
            PipelineError::configuration(format!(
                "cannot create destination {}: {}",
                dest_dir.display(),
                e
            ))
        }),
    }
}

/// Appends the last diagnostic line of a subprocess to a cause.
fn with_stderr_hint(cause: String, stderr: Option<&str>) -> String {
    match stderr.and_then(|s| s.lines().rev().find(|l| !l.trim().is_empty())) {
        Some(line) => format!("{} ({})", cause, line.trim()),
        None => cause,
    }
}

fn fetch_failure(e: FetcherError) -> FailureReason {
    match e {
        FetcherError::Cancelled => FailureReason::CancelledByCaller,
        FetcherError::DownloadFailed { ref stderr, .. } => {
            FailureReason::FetchFailed(with_stderr_hint(e.to_string(), stderr.as_deref()))
        }
        e => FailureReason::FetchFailed(e.to_string()),
    }
}

fn transcode_failure(e: TranscoderError) -> FailureReason {
    match e {
        TranscoderError::Cancelled => FailureReason::CancelledByCaller,
        TranscoderError::TranscodeFailed { ref stderr, .. } => {
            FailureReason::TranscodeFailed(with_stderr_hint(e.to_string(), stderr.as_deref()))
        }
        e => FailureReason::TranscodeFailed(e.to_string()),
    }
}

/// Drives a subsystem future while forwarding its progress.
///
/// Progress still queued when the future completes is forwarded before
/// the result is returned.
async fn drive<R, P>(
    emitter: &mut ProgressEmitter,
    fut: impl Future<Output = R>,
    mut progress_rx: mpsc::Receiver<P>,
    percent_of: impl Fn(&P) -> f32,
) -> R {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            Some(progress) = progress_rx.recv() => {
                emitter.update(percent_of(&progress)).await;
            }
            result = &mut fut => {
                while let Ok(progress) = progress_rx.try_recv() {
                    emitter.update(percent_of(&progress)).await;
                }
                return result;
            }
        }
    }
}

/// Everything one request task needs.
struct RequestTask<F, I, T> {
    request_id: String,
    request: DownloadRequest,
    policy: CodecPolicy,
    channel_capacity: usize,
    fetcher: Arc<F>,
    inspector: Arc<I>,
    transcoder: Arc<T>,
    cancel: CancellationToken,
}

impl<F: Fetcher, I: CodecInspector, T: Transcoder> RequestTask<F, I, T> {
    async fn run(self, mut emitter: ProgressEmitter) -> PipelineResult {
        emitter.enter(Phase::Fetching).await;

        let job = FetchJob {
            job_id: self.request_id.clone(),
            url: self.request.url.clone(),
            dest_dir: self.request.dest_dir.clone(),
            format: self.request.format,
        };
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let fetched = drive(
            &mut emitter,
            self.fetcher.fetch(&job, tx, self.cancel.clone()),
            rx,
            |p: &FetchProgress| p.percent,
        )
        .await;

        let fetched = match fetched {
            Ok(output) => output.file_path,
            Err(e) => return self.fail(&mut emitter, None, fetch_failure(e)).await,
        };

        if self.cancel.is_cancelled() {
            return self
                .fail(&mut emitter, Some(fetched), FailureReason::CancelledByCaller)
                .await;
        }

        if self.request.format == FormatSelector::AudioOnly {
            debug!(
                request_id = %self.request_id,
                file = %fetched.display(),
                "Audio-only output uses the extraction codec, skipping inspection"
            );
            return self.succeed(&mut emitter, fetched).await;
        }

        emitter.enter(Phase::Inspecting).await;
        let inspected = tokio::select! {
            _ = self.cancel.cancelled() => None,
            streams = self.inspector.inspect(&fetched) => Some(streams),
        };
        let streams = match inspected {
            None => {
                return self
                    .fail(&mut emitter, Some(fetched), FailureReason::CancelledByCaller)
                    .await
            }
            Some(Err(e)) => {
                return self
                    .fail(
                        &mut emitter,
                        Some(fetched),
                        FailureReason::InspectionFailed(e.to_string()),
                    )
                    .await
            }
            Some(Ok(streams)) => streams,
        };
        emitter.update(100.0).await;

        if self.policy.is_satisfied_by(&streams) {
            info!(request_id = %self.request_id, "Codecs already compliant, no conversion needed");
            return self.succeed(&mut emitter, fetched).await;
        }

        info!(
            request_id = %self.request_id,
            streams = ?streams,
            video = %self.policy.video,
            audio = %self.policy.audio,
            "Codecs not compliant, converting"
        );
        emitter.enter(Phase::Converting).await;

        let job = TranscodeJob {
            job_id: self.request_id.clone(),
            input_path: fetched.clone(),
            video_codec: self.policy.video,
            audio_codec: self.policy.audio,
        };
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let transcoded = drive(
            &mut emitter,
            self.transcoder.transcode(job, tx, self.cancel.clone()),
            rx,
            |p: &TranscodeProgress| p.percent,
        )
        .await;

        match transcoded {
            Ok(result) => self.succeed(&mut emitter, result.output_path).await,
            Err(e) => {
                let retained = fetched.exists().then_some(fetched);
                self.fail(&mut emitter, retained, transcode_failure(e)).await
            }
        }
    }

    async fn succeed(&self, emitter: &mut ProgressEmitter, path: PathBuf) -> PipelineResult {
        emitter.enter(Phase::Done).await;
        info!(request_id = %self.request_id, file = %path.display(), "Request completed");
        PipelineResult::success(&self.request_id, path)
    }

    async fn fail(
        &self,
        emitter: &mut ProgressEmitter,
        retained: Option<PathBuf>,
        reason: FailureReason,
    ) -> PipelineResult {
        let phase = emitter.phase();
        emitter.enter(Phase::Failed).await;

        match &reason {
            FailureReason::CancelledByCaller => {
                info!(request_id = %self.request_id, phase = ?phase, "Request cancelled")
            }
            _ => error!(request_id = %self.request_id, phase = ?phase, reason = %reason, "Request failed"),
        }
        if let Some(path) = &retained {
            warn!(request_id = %self.request_id, file = %path.display(), "Leaving fetched file in place");
        }

        PipelineResult::failure(&self.request_id, retained, reason)
    }
}
