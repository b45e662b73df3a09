//! Parsing of yt-dlp's textual download progress.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent pattern is valid"));

/// Extracts the download percentage from a yt-dlp `[download]` line.
///
/// Returns `None` for any other line or when no percentage is present.
pub fn parse_download_percent(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix("[download]")?;
    let percent = PERCENT_RE
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())?;

    percent.is_finite().then(|| percent.clamp(0.0, 100.0))
}
