//! Configuration for the inspector module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffprobe-based inspector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

impl InspectorConfig {
    /// Creates a config with a custom ffprobe path.
    pub fn with_path(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }
}
