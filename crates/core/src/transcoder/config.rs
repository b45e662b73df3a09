//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::{ContainerFormat, EncoderPreference};

/// Configuration for the FFmpeg-based transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary, used to count input frames.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// How the video encoder is picked.
    #[serde(default)]
    pub encoder: EncoderPreference,

    /// Container of the transcoded file.
    #[serde(default = "default_container")]
    pub container: ContainerFormat,

    /// Suffix appended to the input stem to name the output.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Keep the partially written `.part.` output when ffmpeg fails.
    #[serde(default)]
    pub retain_partial_output: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional ffmpeg output arguments.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_container() -> ContainerFormat {
    ContainerFormat::Mp4
}

fn default_output_suffix() -> String {
    "_converted".to_string()
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            encoder: EncoderPreference::default(),
            container: default_container(),
            output_suffix: default_output_suffix(),
            retain_partial_output: false,
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl TranscoderConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the encoder preference.
    pub fn with_encoder(mut self, encoder: EncoderPreference) -> Self {
        self.encoder = encoder;
        self
    }

    /// Sets the output container.
    pub fn with_container(mut self, container: ContainerFormat) -> Self {
        self.container = container;
        self
    }

    /// Keeps partial output when a transcode fails.
    pub fn with_retained_partial_output(mut self, retain: bool) -> Self {
        self.retain_partial_output = retain;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranscoderConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.encoder, EncoderPreference::Software);
        assert_eq!(config.container, ContainerFormat::Mp4);
        assert_eq!(config.output_suffix, "_converted");
        assert!(!config.retain_partial_output);
    }

    #[test]
    fn test_config_builder() {
        let config = TranscoderConfig::with_paths(
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffprobe"),
        )
        .with_encoder(EncoderPreference::Auto)
        .with_container(ContainerFormat::Mkv)
        .with_retained_partial_output(true);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.encoder, EncoderPreference::Auto);
        assert_eq!(config.container, ContainerFormat::Mkv);
        assert!(config.retain_partial_output);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            encoder = "hardware"
            output_suffix = "-h264"
        "#;
        let config: TranscoderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.encoder, EncoderPreference::Hardware);
        assert_eq!(config.output_suffix, "-h264");
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
    }
}
