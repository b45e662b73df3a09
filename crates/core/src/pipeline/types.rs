//! Types for the pipeline module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::fetcher::FormatSelector;

/// A validated request to download and normalize one media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL.
    pub url: String,
    /// Directory the final file is written to.
    pub dest_dir: PathBuf,
    /// Audio-only or muxed video.
    pub format: FormatSelector,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, dest_dir: impl Into<PathBuf>, format: FormatSelector) -> Self {
        Self {
            url: url.into(),
            dest_dir: dest_dir.into(),
            format,
        }
    }
}

/// Phase of a request.
///
/// Phases only move forward: `Fetching → Inspecting → Converting → Done`,
/// with `Inspecting` and `Converting` skipped when not needed and `Failed`
/// reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Fetching,
    Inspecting,
    Converting,
    Done,
    Failed,
}

impl Phase {
    /// Whether no further events follow this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Inspecting => "inspecting",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized progress for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub request_id: String,
    pub phase: Phase,
    /// 0-100, non-decreasing within a phase.
    pub percent: f32,
}

/// Why a request failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cause", rename_all = "snake_case")]
pub enum FailureReason {
    Configuration(String),
    FetchFailed(String),
    InspectionFailed(String),
    TranscodeFailed(String),
    CancelledByCaller,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(cause) => write!(f, "configuration error: {}", cause),
            Self::FetchFailed(cause) => write!(f, "fetch failed: {}", cause),
            Self::InspectionFailed(cause) => write!(f, "inspection failed: {}", cause),
            Self::TranscodeFailed(cause) => write!(f, "transcode failed: {}", cause),
            Self::CancelledByCaller => f.write_str("cancelled by caller"),
        }
    }
}

/// Terminal outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

/// Result delivered exactly once per accepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub request_id: String,
    /// The finished file on success. On failure, the last file known to
    /// exist for the request (the fetched, pre-conversion file), if any.
    pub final_file_path: Option<PathBuf>,
    pub outcome: Outcome,
}

impl PipelineResult {
    pub fn success(request_id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            request_id: request_id.into(),
            final_file_path: Some(path),
            outcome: Outcome::Success,
        }
    }

    pub fn failure(
        request_id: impl Into<String>,
        retained: Option<PathBuf>,
        reason: FailureReason,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            final_file_path: retained,
            outcome: Outcome::Failure(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// The failure reason, if the request failed.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure(reason) => Some(reason),
        }
    }
}

/// A request that has not reached a terminal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRequest {
    pub request_id: String,
    pub url: String,
    pub format: FormatSelector,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
}

/// Snapshot of the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Active requests, oldest first.
    pub active: Vec<ActiveRequest>,
}

impl OrchestratorStatus {
    /// Phase of an active request.
    pub fn phase_of(&self, request_id: &str) -> Option<Phase> {
        self.active
            .iter()
            .find(|r| r.request_id == request_id)
            .map(|r| r.phase)
    }
}
