//! Transcoder module for normalizing media files to a compatible codec pair.
//!
//! This module provides the `Transcoder` trait and an FFmpeg implementation.
//!
//! # Features
//!
//! - Video re-encoding (H.264, HEVC, VP9, AV1) with optional hardware encoders
//! - Audio re-encoding (AAC, MP3, Opus, Vorbis, FLAC)
//! - Frame-accurate progress reporting (total frames counted up front)
//! - Partial output written under a `.part.` name and promoted on success
//! - Cancellation through a `CancellationToken`
//!
//! # Example
//!
//! ```ignore
//! use mediafetch_core::transcoder::{
//!     AudioCodec, FfmpegTranscoder, TranscodeJob, Transcoder, VideoCodec,
//! };
//!
//! let transcoder = FfmpegTranscoder::with_defaults();
//! transcoder.validate().await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(32);
//! let job = TranscodeJob {
//!     job_id: "job-1".to_string(),
//!     input_path: PathBuf::from("/downloads/clip.webm"),
//!     video_codec: VideoCodec::H264,
//!     audio_codec: AudioCodec::Aac,
//! };
//!
//! let result = transcoder.transcode(job, tx, CancellationToken::new()).await?;
//! println!("Wrote {}", result.output_path.display());
//! ```

mod capabilities;
mod config;
mod error;
mod ffmpeg;
pub mod progress;
mod traits;
mod types;

pub use capabilities::EncoderCapabilities;
pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{
    AudioCodec, ContainerFormat, EncoderPreference, TranscodeJob, TranscodeProgress,
    TranscodeResult, VideoCodec,
};
