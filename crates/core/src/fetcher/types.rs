//! Types for the fetcher module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// What the fetcher should retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSelector {
    /// Best audio stream, extracted to a fixed audio codec.
    AudioOnly,
    /// Best video+audio pair merged into one container.
    MuxedVideo,
}

impl FormatSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AudioOnly => "audio",
            Self::MuxedVideo => "video",
        }
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a format selector string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized format selector: {0:?} (expected \"audio\" or \"video\")")]
pub struct ParseFormatSelectorError(pub String);

impl FromStr for FormatSelector {
    type Err = ParseFormatSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" | "mp3" => Ok(Self::AudioOnly),
            "video" | "mp4" => Ok(Self::MuxedVideo),
            _ => Err(ParseFormatSelectorError(s.to_string())),
        }
    }
}

/// A fetch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    /// Unique identifier for this job.
    pub job_id: String,
    /// Source URL.
    pub url: String,
    /// Directory the final file is written to.
    pub dest_dir: PathBuf,
    /// Audio-only or muxed video.
    pub format: FormatSelector,
}

/// Progress update during a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchProgress {
    /// Job ID.
    pub job_id: String,
    /// Percent of bytes downloaded for the current file (0-100).
    pub percent: f32,
}

/// Result of a successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutput {
    /// Job ID.
    pub job_id: String,
    /// Path of the file that was actually written.
    pub file_path: PathBuf,
    /// Title reported by the source, if any.
    pub title: Option<String>,
    /// Size of the written file.
    pub size_bytes: u64,
    /// Wall-clock time spent fetching.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_selector() {
        assert_eq!("audio".parse::<FormatSelector>().unwrap(), FormatSelector::AudioOnly);
        assert_eq!("video".parse::<FormatSelector>().unwrap(), FormatSelector::MuxedVideo);
        assert_eq!(" MP4 ".parse::<FormatSelector>().unwrap(), FormatSelector::MuxedVideo);
        assert_eq!("mp3".parse::<FormatSelector>().unwrap(), FormatSelector::AudioOnly);
    }

    #[test]
    fn test_parse_format_selector_rejects_unknown() {
        let err = "avi".parse::<FormatSelector>().unwrap_err();
        assert_eq!(err, ParseFormatSelectorError("avi".to_string()));
        assert!(err.to_string().contains("unrecognized format selector"));
        assert!("".parse::<FormatSelector>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for selector in [FormatSelector::AudioOnly, FormatSelector::MuxedVideo] {
            assert_eq!(selector.to_string().parse::<FormatSelector>().unwrap(), selector);
        }
    }
}
