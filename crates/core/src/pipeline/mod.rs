//! Download-and-normalize pipeline.
//!
//! The orchestrator composes the three subsystems for each request:
//!
//! ```text
//! Fetching ──► Inspecting ──► Converting ──► Done
//!    │  (audio)    │ (compliant)    ▲
//!    └─────────────┴────────────────┴──► Done
//!    any non-terminal phase ──────────► Failed
//! ```
//!
//! Progress from the fetcher (bytes) and the transcoder (frames) is merged
//! into one [`ProgressEvent`] stream per request, and exactly one
//! [`PipelineResult`] is delivered for every accepted request.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediafetch_core::pipeline::{CodecPolicy, PipelineConfig, PipelineOrchestrator};
//!
//! let orchestrator = PipelineOrchestrator::new(
//!     PipelineConfig::default(),
//!     CodecPolicy::default(),
//!     YtDlpFetcher::with_defaults(),
//!     FfprobeInspector::with_defaults(),
//!     FfmpegTranscoder::with_defaults(),
//! );
//!
//! let handle = orchestrator.submit("https://x/video123", "/tmp/out", "video").await?;
//! let result = handle.wait_with(|e| println!("{} {:.0}%", e.phase, e.percent)).await?;
//! ```

mod config;
mod error;
mod policy;
mod progress;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use policy::CodecPolicy;
pub use progress::{PhaseTracker, ProgressCallback};
pub use runner::{PipelineOrchestrator, RequestHandle, ResultCallback};
pub use types::{
    ActiveRequest, DownloadRequest, FailureReason, OrchestratorStatus, Outcome, Phase,
    PipelineResult, ProgressEvent,
};
