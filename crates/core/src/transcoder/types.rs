//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Video codec a file can be normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    Hevc,
    /// VP9
    Vp9,
    /// AV1
    Av1,
}

impl VideoCodec {
    /// Returns the codec name as reported by ffprobe.
    pub fn codec_name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
        }
    }

    /// Returns the ffmpeg software encoder for this codec.
    pub fn software_encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Av1 => "libaom-av1",
        }
    }

    /// Returns the hardware encoders that can produce this codec, in order of preference.
    pub fn hardware_encoders(&self) -> &'static [&'static str] {
        match self {
            Self::H264 => &["h264_nvenc", "h264_qsv", "h264_amf", "h264_videotoolbox"],
            Self::Hevc => &["hevc_nvenc", "hevc_qsv", "hevc_amf", "hevc_videotoolbox"],
            Self::Vp9 => &["vp9_qsv"],
            Self::Av1 => &["av1_nvenc", "av1_qsv", "av1_amf"],
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_name())
    }
}

/// Audio codec a file can be normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// Advanced Audio Coding
    Aac,
    /// MPEG Audio Layer III
    Mp3,
    /// Opus
    Opus,
    /// Vorbis
    Vorbis,
    /// Free Lossless Audio Codec
    Flac,
}

impl AudioCodec {
    /// Returns the codec name as reported by ffprobe.
    pub fn codec_name(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
        }
    }

    /// Returns the ffmpeg encoder for this codec.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
            Self::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_name())
    }
}

/// Container format for transcoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// MPEG-4 Part 14 (.mp4)
    Mp4,
    /// Matroska (.mkv)
    Mkv,
    /// WebM
    Webm,
    /// QuickTime (.mov)
    Mov,
}

impl ContainerFormat {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }
}

/// How the video encoder is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderPreference {
    /// Always use the software encoder.
    #[default]
    Software,
    /// Use a hardware encoder when ffmpeg reports one, otherwise software.
    Auto,
    /// Require a hardware encoder.
    Hardware,
}

/// A transcode job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Unique identifier for this job.
    pub job_id: String,
    /// File to transcode. Removed once the transcode succeeds.
    pub input_path: PathBuf,
    /// Target video codec.
    pub video_codec: VideoCodec,
    /// Target audio codec.
    pub audio_codec: AudioCodec,
}

/// Progress update during a transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeProgress {
    /// Job ID.
    pub job_id: String,
    /// Last encoded frame reported by ffmpeg.
    pub frame: u64,
    /// Total frames in the input, if they could be counted.
    pub total_frames: Option<u64>,
    /// Percent complete (0-100). Stays at 0 when the total is unknown.
    pub percent: f32,
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    /// Job ID.
    pub job_id: String,
    /// Path to the transcoded file.
    pub output_path: PathBuf,
    /// Size of the transcoded file.
    pub output_size_bytes: u64,
    /// Wall-clock time spent transcoding.
    pub duration_ms: u64,
    /// ffmpeg video encoder that was used.
    pub video_encoder: String,
}
