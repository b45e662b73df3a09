//! Remote media retrieval.
//!
//! Downloads a single media item from a URL into a destination directory,
//! either as extracted audio or as a merged video+audio container. The
//! default implementation drives yt-dlp and reports byte progress parsed
//! from its `[download]` lines.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediafetch_core::fetcher::{Fetcher, FetchJob, FormatSelector, YtDlpFetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! let fetcher = YtDlpFetcher::with_defaults();
//! let job = FetchJob {
//!     job_id: "job-1".to_string(),
//!     url: "https://www.youtube.com/watch?v=abc".to_string(),
//!     dest_dir: "/media/downloads".into(),
//!     format: FormatSelector::MuxedVideo,
//! };
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(32);
//! let output = fetcher.fetch(&job, tx, CancellationToken::new()).await?;
//! println!("wrote {}", output.file_path.display());
//! ```

mod config;
mod error;
pub mod progress;
mod traits;
mod types;
mod ytdlp;

pub use config::FetcherConfig;
pub use error::FetcherError;
pub use traits::Fetcher;
pub use types::{FetchJob, FetchOutput, FetchProgress, FormatSelector, ParseFormatSelectorError};
pub use ytdlp::YtDlpFetcher;
