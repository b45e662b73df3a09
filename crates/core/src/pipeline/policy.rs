//! Codec compatibility policy.

use serde::{Deserialize, Serialize};

use crate::inspector::{MediaStreamInfo, StreamType};
use crate::transcoder::{AudioCodec, VideoCodec};

/// The codec pair downstream consumers are guaranteed to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecPolicy {
    #[serde(default = "default_video")]
    pub video: VideoCodec,
    #[serde(default = "default_audio")]
    pub audio: AudioCodec,
}

fn default_video() -> VideoCodec {
    VideoCodec::H264
}

fn default_audio() -> AudioCodec {
    AudioCodec::Aac
}

impl Default for CodecPolicy {
    fn default() -> Self {
        Self {
            video: default_video(),
            audio: default_audio(),
        }
    }
}

impl CodecPolicy {
    pub fn new(video: VideoCodec, audio: AudioCodec) -> Self {
        Self { video, audio }
    }

    /// Whether a probed file already satisfies the policy.
    ///
    /// Some video stream must use the required video codec and some audio
    /// stream the required audio codec. Other streams are ignored, so an
    /// embedded cover image (reported as an `mjpeg`/`png` video stream)
    /// does not force a conversion.
    pub fn is_satisfied_by(&self, streams: &[MediaStreamInfo]) -> bool {
        let has = |kind: StreamType, codec: &str| {
            streams
                .iter()
                .any(|s| s.stream_type == kind && s.codec_name.eq_ignore_ascii_case(codec))
        };
        has(StreamType::Video, self.video.codec_name()) && has(StreamType::Audio, self.audio.codec_name())
    }
}
