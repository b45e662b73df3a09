//! Codec inspector: lists the video/audio codecs inside a media container.

mod config;
mod error;
mod ffprobe;
mod traits;
mod types;

pub use config::InspectorConfig;
pub use error::InspectorError;
pub use ffprobe::FfprobeInspector;
pub use traits::CodecInspector;
pub use types::{MediaStreamInfo, StreamType};
