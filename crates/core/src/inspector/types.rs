//! Types for the inspector module.

use serde::{Deserialize, Serialize};

/// Kind of elementary stream relevant to codec compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Video,
    Audio,
}

impl StreamType {
    /// Maps an ffprobe `codec_type` to a stream type.
    ///
    /// Subtitle, data and attachment streams return `None`.
    pub fn from_codec_type(codec_type: &str) -> Option<Self> {
        match codec_type {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// A single stream found in a media container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaStreamInfo {
    pub stream_type: StreamType,
    pub codec_name: String,
}

impl MediaStreamInfo {
    pub fn new(stream_type: StreamType, codec_name: impl Into<String>) -> Self {
        Self {
            stream_type,
            codec_name: codec_name.into(),
        }
    }

    pub fn video(codec_name: impl Into<String>) -> Self {
        Self::new(StreamType::Video, codec_name)
    }

    pub fn audio(codec_name: impl Into<String>) -> Self {
        Self::new(StreamType::Audio, codec_name)
    }
}
