//! Parsing of ffmpeg/ffprobe output for frame-based progress.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

static FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frame=\s*(\d+)").expect("frame pattern is valid"));

/// Extracts the encoded-frame counter from an ffmpeg progress line.
///
/// Matches both the `-progress` form (`frame=120`) and the stats form
/// (`frame=  120 fps= 30 ...`).
pub fn parse_frame(line: &str) -> Option<u64> {
    FRAME_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Computes the percentage of `frame` over `total_frames`, clamped to [0, 100].
///
/// Returns 0 when the total is unknown or zero.
pub fn frame_percent(frame: u64, total_frames: Option<u64>) -> f32 {
    match total_frames {
        Some(total) if total > 0 => ((frame as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32,
        _ => 0.0,
    }
}

/// Parses the output of `ffprobe -count_frames -show_entries stream=nb_read_frames -of json`.
pub fn parse_frame_count(output: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct CountOutput {
        #[serde(default)]
        streams: Vec<CountStream>,
    }

    #[derive(Deserialize)]
    struct CountStream {
        nb_read_frames: Option<String>,
    }

    let parsed: CountOutput = serde_json::from_str(output).ok()?;
    parsed
        .streams
        .first()
        .and_then(|s| s.nb_read_frames.as_deref())
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_progress_form() {
        assert_eq!(parse_frame("frame=120"), Some(120));
    }

    #[test]
    fn test_parse_frame_stats_form() {
        let line = "frame=  347 fps= 41 q=28.0 size=    1024kB time=00:00:11.50 bitrate= 729.4kbits/s speed=1.36x";
        assert_eq!(parse_frame(line), Some(347));
    }

    #[test]
    fn test_parse_frame_absent() {
        assert_eq!(parse_frame("out_time_ms=1000000"), None);
        assert_eq!(parse_frame("progress=continue"), None);
    }

    #[test]
    fn test_frame_percent() {
        assert_eq!(frame_percent(50, Some(200)), 25.0);
        assert_eq!(frame_percent(250, Some(200)), 100.0);
        assert_eq!(frame_percent(10, None), 0.0);
        assert_eq!(frame_percent(10, Some(0)), 0.0);
    }

    #[test]
    fn test_parse_frame_count() {
        let json = r#"{"programs": [], "streams": [{"nb_read_frames": "1440"}]}"#;
        assert_eq!(parse_frame_count(json), Some(1440));
    }

    #[test]
    fn test_parse_frame_count_missing() {
        assert_eq!(parse_frame_count(r#"{"streams": []}"#), None);
        assert_eq!(parse_frame_count(r#"{"streams": [{"nb_read_frames": "N/A"}]}"#), None);
        assert_eq!(parse_frame_count("not json"), None);
    }
}
