//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp based fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Format selection for muxed video: preferred container pair first,
    /// then generic fallbacks.
    #[serde(default = "default_video_format")]
    pub video_format: String,

    /// Container the video and audio streams are merged into.
    #[serde(default = "default_merge_output_format")]
    pub merge_output_format: String,

    /// Format selection for audio-only downloads.
    #[serde(default = "default_audio_selection")]
    pub audio_selection: String,

    /// Codec audio-only downloads are extracted to.
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Target bitrate of the extracted audio.
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Output template, relative to the destination directory.
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// Additional yt-dlp arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_video_format() -> String {
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
}

fn default_merge_output_format() -> String {
    "mp4".to_string()
}

fn default_audio_selection() -> String {
    "bestaudio/best".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            video_format: default_video_format(),
            merge_output_format: default_merge_output_format(),
            audio_selection: default_audio_selection(),
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
            output_template: default_output_template(),
            extra_args: Vec::new(),
        }
    }
}

impl FetcherConfig {
    /// Creates a config with a custom yt-dlp path.
    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self {
            ytdlp_path,
            ..Default::default()
        }
    }

    /// Sets the audio extraction codec and bitrate.
    pub fn with_audio(mut self, format: impl Into<String>, quality: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self.audio_quality = quality.into();
        self
    }
}
