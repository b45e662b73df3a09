//! Trait definitions for the inspector module.

use async_trait::async_trait;
use std::path::Path;

use super::error::InspectorError;
use super::types::MediaStreamInfo;

/// Read-only probe of the streams inside a media container.
#[async_trait]
pub trait CodecInspector: Send + Sync {
    /// Returns the name of this inspector implementation.
    fn name(&self) -> &str;

    /// Lists the video and audio streams of a file.
    ///
    /// Must not modify the file.
    async fn inspect(&self, path: &Path) -> Result<Vec<MediaStreamInfo>, InspectorError>;

    /// Validates that the inspector is properly configured and ready.
    async fn validate(&self) -> Result<(), InspectorError>;
}
