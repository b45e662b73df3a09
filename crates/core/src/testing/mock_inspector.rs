//! Mock codec inspector for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::inspector::{CodecInspector, InspectorError, MediaStreamInfo};

/// Mock implementation of the CodecInspector trait.
///
/// Returns per-path stream lists, falling back to a default (`h264`/`aac`).
/// Like the real prober, a missing file is an error.
#[derive(Debug, Clone)]
pub struct MockInspector {
    /// Paths that were inspected, in order.
    calls: Arc<RwLock<Vec<PathBuf>>>,
    /// Pre-configured streams by path.
    results: Arc<RwLock<HashMap<PathBuf, Vec<MediaStreamInfo>>>>,
    /// Streams reported for any other file.
    default_streams: Arc<RwLock<Vec<MediaStreamInfo>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<InspectorError>>>,
}

impl Default for MockInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInspector {
    /// Create a new mock inspector.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            default_streams: Arc::new(RwLock::new(vec![
                MediaStreamInfo::video("h264"),
                MediaStreamInfo::audio("aac"),
            ])),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the paths that were inspected.
    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    /// Get the number of inspections performed.
    pub async fn inspect_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Set the streams reported for a specific path.
    pub async fn set_streams(&self, path: impl AsRef<Path>, streams: Vec<MediaStreamInfo>) {
        self.results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), streams);
    }

    /// Set the streams reported for files without a specific result.
    pub async fn set_default_streams(&self, streams: Vec<MediaStreamInfo>) {
        *self.default_streams.write().await = streams;
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: InspectorError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<InspectorError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl CodecInspector for MockInspector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn inspect(&self, path: &Path) -> Result<Vec<MediaStreamInfo>, InspectorError> {
        self.calls.write().await.push(path.to_path_buf());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if !path.exists() {
            return Err(InspectorError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        if let Some(streams) = self.results.read().await.get(path) {
            return Ok(streams.clone());
        }
        Ok(self.default_streams.read().await.clone())
    }

    async fn validate(&self) -> Result<(), InspectorError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_and_custom_streams() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.webm");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let inspector = MockInspector::new();
        inspector
            .set_streams(&b, vec![MediaStreamInfo::video("vp9"), MediaStreamInfo::audio("opus")])
            .await;

        let streams = inspector.inspect(&a).await.unwrap();
        assert_eq!(streams[0].codec_name, "h264");
        let streams = inspector.inspect(&b).await.unwrap();
        assert_eq!(streams[0].codec_name, "vp9");
        assert_eq!(inspector.recorded_calls().await, vec![a, b]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let inspector = MockInspector::new();
        let result = inspector.inspect(Path::new("/nonexistent/file.mp4")).await;
        assert!(matches!(result, Err(InspectorError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_error_injection() {
        let inspector = MockInspector::new();
        inspector
            .set_next_error(InspectorError::probe_failed("moov atom not found"))
            .await;
        assert!(inspector.validate().await.is_err());
        assert!(inspector.validate().await.is_ok());
    }
}
