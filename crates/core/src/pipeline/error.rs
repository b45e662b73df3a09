//! Error types for the pipeline module.

use thiserror::Error;

use crate::fetcher::FetcherError;
use crate::inspector::InspectorError;
use crate::transcoder::TranscoderError;

/// Errors returned by the orchestrator itself.
///
/// Failures that happen after a request is accepted are reported through
/// its [`PipelineResult`](super::PipelineResult) instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before any work started.
    #[error("Invalid request: {0}")]
    Configuration(String),

    /// No active request with this ID.
    #[error("Request not found: {0}")]
    RequestNotFound(String),

    /// The request task ended without delivering a result.
    #[error("Result for request {0} was dropped")]
    ResultDropped(String),

    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    #[error(transparent)]
    Inspector(#[from] InspectorError),

    #[error(transparent)]
    Transcoder(#[from] TranscoderError),
}

impl PipelineError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}
