pub mod config;
pub mod fetcher;
pub mod inspector;
pub mod pipeline;
pub mod testing;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use fetcher::{FetchJob, FetchOutput, FetchProgress, Fetcher, FetcherError, FormatSelector, YtDlpFetcher};
pub use inspector::{CodecInspector, FfprobeInspector, InspectorError, MediaStreamInfo, StreamType};
pub use pipeline::{
    CodecPolicy, DownloadRequest, FailureReason, Outcome, Phase, PipelineConfig, PipelineError,
    PipelineOrchestrator, PipelineResult, ProgressEvent, RequestHandle,
};
pub use transcoder::{
    AudioCodec, EncoderPreference, FfmpegTranscoder, Transcoder, TranscoderError, VideoCodec,
};
