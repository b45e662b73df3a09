//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the fetcher, inspector and
//! transcoder traits, allowing the full pipeline to be exercised without
//! yt-dlp or ffmpeg installed. The mocks create and delete real files so
//! on-disk guarantees can be asserted.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediafetch_core::testing::{fixtures, MockFetcher, MockInspector, MockTranscoder};
//!
//! let fetcher = MockFetcher::new();
//! let inspector = MockInspector::new();
//! let transcoder = MockTranscoder::new();
//!
//! inspector.set_default_streams(fixtures::streams("vp9", "opus")).await;
//!
//! // Hand clones to the orchestrator, keep the originals for assertions.
//! ```

mod mock_fetcher;
mod mock_inspector;
mod mock_transcoder;

pub use mock_fetcher::MockFetcher;
pub use mock_inspector::MockInspector;
pub use mock_transcoder::{MockTranscoder, RecordedTranscode};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::inspector::MediaStreamInfo;

    /// One video and one audio stream with the given codecs.
    pub fn streams(video: &str, audio: &str) -> Vec<MediaStreamInfo> {
        vec![MediaStreamInfo::video(video), MediaStreamInfo::audio(audio)]
    }
}
