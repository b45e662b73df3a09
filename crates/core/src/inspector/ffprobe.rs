//! FFprobe-based codec inspector.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::config::InspectorConfig;
use super::error::InspectorError;
use super::traits::CodecInspector;
use super::types::{MediaStreamInfo, StreamType};

/// Inspector that asks ffprobe for `codec_type`/`codec_name` of every stream.
pub struct FfprobeInspector {
    config: InspectorConfig,
}

impl FfprobeInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(InspectorConfig::default())
    }

    /// Parses `ffprobe -show_entries stream=codec_type,codec_name -of json` output.
    fn parse_streams(output: &str) -> Result<Vec<MediaStreamInfo>, InspectorError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            codec_name: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| InspectorError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        Ok(probe
            .streams
            .into_iter()
            .filter_map(|s| {
                let stream_type = StreamType::from_codec_type(s.codec_type.as_deref()?)?;
                Some(MediaStreamInfo::new(stream_type, s.codec_name?))
            })
            .collect())
    }
}

#[async_trait]
impl CodecInspector for FfprobeInspector {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn inspect(&self, path: &Path) -> Result<Vec<MediaStreamInfo>, InspectorError> {
        if !path.exists() {
            return Err(InspectorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=codec_type,codec_name",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InspectorError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    InspectorError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(InspectorError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let streams = Self::parse_streams(&String::from_utf8_lossy(&output.stdout))?;
        debug!(path = %path.display(), ?streams, "Inspected media streams");
        Ok(streams)
    }

    async fn validate(&self) -> Result<(), InspectorError> {
        let status = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InspectorError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    InspectorError::Io(e)
                }
            })?;

        if !status.success() {
            return Err(InspectorError::probe_failed(format!(
                "ffprobe -version exited with code: {:?}",
                status.code()
            )));
        }
        Ok(())
    }
}
