use serde::{Deserialize, Serialize};

use crate::fetcher::FetcherConfig;
use crate::inspector::InspectorConfig;
use crate::pipeline::{CodecPolicy, PipelineConfig};
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub inspector: InspectorConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub policy: CodecPolicy,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}
