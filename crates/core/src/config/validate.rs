use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;

use super::{types::Config, ConfigError};

static AUDIO_QUALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?[kK]?$").expect("audio quality pattern is valid"));

fn require_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn require_value(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Validate configuration
/// Currently validates:
/// - Binary paths are not empty
/// - Fetch format options are not empty, audio quality is a bitrate or VBR level
/// - Transcoder output suffix is not empty (output would replace its input)
/// - Channel capacities are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    require_path("fetcher.ytdlp_path", &config.fetcher.ytdlp_path)?;
    require_path("inspector.ffprobe_path", &config.inspector.ffprobe_path)?;
    require_path("transcoder.ffmpeg_path", &config.transcoder.ffmpeg_path)?;
    require_path("transcoder.ffprobe_path", &config.transcoder.ffprobe_path)?;

    require_value("fetcher.video_format", &config.fetcher.video_format)?;
    require_value("fetcher.audio_selection", &config.fetcher.audio_selection)?;
    require_value("fetcher.audio_format", &config.fetcher.audio_format)?;
    require_value("fetcher.merge_output_format", &config.fetcher.merge_output_format)?;
    require_value("fetcher.output_template", &config.fetcher.output_template)?;
    if !AUDIO_QUALITY_RE.is_match(&config.fetcher.audio_quality) {
        return Err(ConfigError::ValidationError(format!(
            "fetcher.audio_quality must be a bitrate like \"192K\" or a VBR level, got {:?}",
            config.fetcher.audio_quality
        )));
    }

    require_value("transcoder.output_suffix", &config.transcoder.output_suffix)?;
    require_value("transcoder.ffmpeg_log_level", &config.transcoder.ffmpeg_log_level)?;

    if config.pipeline.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.channel_capacity cannot be 0".to_string(),
        ));
    }
    if config.pipeline.subsystem_channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.subsystem_channel_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_binary_path_fails() {
        let mut config = Config::default();
        config.fetcher.ytdlp_path = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("ytdlp_path")));
    }

    #[test]
    fn test_validate_audio_quality() {
        let mut config = Config::default();
        for ok in ["192K", "320k", "0", "5", "128"] {
            config.fetcher.audio_quality = ok.to_string();
            assert!(validate_config(&config).is_ok(), "{} should be accepted", ok);
        }
        for bad in ["", "high", "192 K", "K"] {
            config.fetcher.audio_quality = bad.to_string();
            assert!(validate_config(&config).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_validate_empty_output_suffix_fails() {
        let mut config = Config::default();
        config.transcoder.output_suffix = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_channel_capacity_zero_fails() {
        let mut config = Config::default();
        config.pipeline.channel_capacity = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
