//! Hardware encoder capability detection.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use super::config::TranscoderConfig;
use super::types::VideoCodec;

/// Encoders ffmpeg is probed for.
const HARDWARE_ENCODERS: &[&str] = &[
    "h264_nvenc",
    "hevc_nvenc",
    "av1_nvenc",
    "h264_qsv",
    "hevc_qsv",
    "vp9_qsv",
    "av1_qsv",
    "h264_amf",
    "hevc_amf",
    "av1_amf",
    "h264_videotoolbox",
    "hevc_videotoolbox",
];

/// Hardware encoders detected in the local ffmpeg build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// Hardware encoder names listed by `ffmpeg -encoders`.
    pub hardware_encoders: Vec<String>,
}

impl EncoderCapabilities {
    /// Detect available hardware encoders by probing ffmpeg.
    pub async fn detect(config: &TranscoderConfig) -> Self {
        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => Self::parse(&String::from_utf8_lossy(&o.stdout)),
            _ => Self::default(),
        }
    }

    /// Parses `ffmpeg -encoders` output.
    pub fn parse(listing: &str) -> Self {
        let hardware_encoders = listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .filter(|name| HARDWARE_ENCODERS.contains(name))
            .map(str::to_string)
            .collect();

        Self { hardware_encoders }
    }

    /// Returns the preferred hardware encoder for a codec, if one was detected.
    pub fn hardware_encoder_for(&self, codec: VideoCodec) -> Option<&'static str> {
        codec
            .hardware_encoders()
            .iter()
            .copied()
            .find(|candidate| self.hardware_encoders.iter().any(|e| e == candidate))
    }

    /// Check if any hardware encoder is available.
    pub fn has_hardware_encoder(&self) -> bool {
        !self.hardware_encoders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 V....D hevc_qsv             HEVC (Intel Quick Sync Video acceleration) (codec hevc)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_default_capabilities() {
        let caps = EncoderCapabilities::default();
        assert!(!caps.has_hardware_encoder());
        assert_eq!(caps.hardware_encoder_for(VideoCodec::H264), None);
    }

    #[test]
    fn test_parse_listing() {
        let caps = EncoderCapabilities::parse(LISTING);
        assert_eq!(caps.hardware_encoders, vec!["h264_nvenc", "hevc_qsv"]);
        assert!(caps.has_hardware_encoder());
    }

    #[test]
    fn test_hardware_encoder_for_codec() {
        let caps = EncoderCapabilities::parse(LISTING);
        assert_eq!(caps.hardware_encoder_for(VideoCodec::H264), Some("h264_nvenc"));
        assert_eq!(caps.hardware_encoder_for(VideoCodec::Hevc), Some("hevc_qsv"));
        assert_eq!(caps.hardware_encoder_for(VideoCodec::Av1), None);
    }
}
