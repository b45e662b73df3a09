//! Common test utilities for pipeline integration tests.
//!
//! Provides an orchestrator wired to the mock subsystems, plus helpers to
//! collect a request's events and check their ordering.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mediafetch_core::{
    fetcher::FetcherConfig,
    inspector::InspectorConfig,
    pipeline::{PipelineConfig, RequestHandle},
    testing::{MockFetcher, MockInspector, MockTranscoder},
    transcoder::TranscoderConfig,
    CodecPolicy, FfmpegTranscoder, FfprobeInspector, Phase, PipelineOrchestrator, PipelineResult,
    ProgressEvent, YtDlpFetcher,
};

/// Re-export fixtures for test convenience
pub use mediafetch_core::testing::fixtures;

/// Orchestrator with mock dependencies and a scratch destination.
pub struct TestHarness {
    pub orchestrator: PipelineOrchestrator<MockFetcher, MockInspector, MockTranscoder>,
    pub fetcher: MockFetcher,
    pub inspector: MockInspector,
    pub transcoder: MockTranscoder,
    pub dest: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_orchestrator(|o| o)
    }

    /// Builds the harness, letting the caller attach callbacks.
    pub fn with_orchestrator(
        customize: impl FnOnce(
            PipelineOrchestrator<MockFetcher, MockInspector, MockTranscoder>,
        ) -> PipelineOrchestrator<MockFetcher, MockInspector, MockTranscoder>,
    ) -> Self {
        let fetcher = MockFetcher::new();
        let inspector = MockInspector::new();
        let transcoder = MockTranscoder::new();

        let orchestrator = customize(PipelineOrchestrator::new(
            PipelineConfig::default(),
            CodecPolicy::default(),
            fetcher.clone(),
            inspector.clone(),
            transcoder.clone(),
        ));

        Self {
            orchestrator,
            fetcher,
            inspector,
            transcoder,
            dest: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn dest_path(&self) -> &Path {
        self.dest.path()
    }

    /// Path the mock fetcher writes for a muxed video request.
    pub fn fetched_video(&self) -> PathBuf {
        self.dest.path().join("video123.mp4")
    }

    /// Path the mock transcoder writes for the fetched video.
    pub fn converted_video(&self) -> PathBuf {
        self.dest.path().join("video123_converted.mp4")
    }

    /// Submits a request and waits for it, collecting every event.
    pub async fn run(&self, url: &str, format: &str) -> (Vec<ProgressEvent>, PipelineResult) {
        let handle = self
            .orchestrator
            .submit(url, self.dest.path(), format)
            .await
            .expect("Request was rejected");
        collect(handle).await
    }
}

/// Drains a handle's events and returns them with the result.
pub async fn collect(handle: RequestHandle) -> (Vec<ProgressEvent>, PipelineResult) {
    let mut events = Vec::new();
    let result = handle
        .wait_with(|e| events.push(e.clone()))
        .await
        .expect("Result was dropped");
    (events, result)
}

/// Distinct phases in the order they were entered.
pub fn phases(events: &[ProgressEvent]) -> Vec<Phase> {
    let mut phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
    phases.dedup();
    phases
}

/// Asserts phases never go back and percent never drops within a phase.
pub fn assert_ordered(events: &[ProgressEvent]) {
    for pair in events.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(
            next.phase >= prev.phase,
            "phase went backwards: {:?} -> {:?}",
            prev.phase,
            next.phase
        );
        if next.phase == prev.phase {
            assert!(
                next.percent >= prev.percent,
                "percent decreased in {:?}: {} -> {}",
                next.phase,
                prev.percent,
                next.percent
            );
        }
    }
}

/// Writes an executable shell script standing in for an external tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("Failed to make script executable");
    path
}

/// Orchestrator backed by the real subprocess implementations, pointed at
/// fake tool scripts written into `tools`.
#[cfg(unix)]
pub fn tool_orchestrator(
    tools: &Path,
    ytdlp_body: &str,
    ffmpeg_body: &str,
) -> PipelineOrchestrator<YtDlpFetcher, FfprobeInspector, FfmpegTranscoder> {
    let ytdlp = write_script(tools, "yt-dlp", ytdlp_body);
    let ffprobe = write_script(tools, "ffprobe", FAKE_FFPROBE);
    let ffmpeg = write_script(tools, "ffmpeg", ffmpeg_body);

    PipelineOrchestrator::new(
        PipelineConfig::default(),
        CodecPolicy::default(),
        YtDlpFetcher::new(FetcherConfig::with_path(ytdlp)),
        FfprobeInspector::new(InspectorConfig::with_path(ffprobe.clone())),
        FfmpegTranscoder::new(TranscoderConfig::with_paths(ffmpeg, ffprobe)),
    )
}

/// Fake yt-dlp: prints download progress, writes `clip.webm` into the
/// `-P` home directory and answers metadata queries with JSON.
pub const FAKE_YTDLP: &str = r#"
case "$1" in --version) echo 2024.01.01; exit 0 ;; esac
dest=""
json=0
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-single-json) json=1 ;;
    -P)
      case "$2" in
        temp:*) mkdir -p "${2#temp:}" ;;
        *) dest="$2" ;;
      esac
      ;;
  esac
  shift
done
if [ "$json" = 1 ]; then
  printf '{"title":"clip","ext":"webm","filename":"%s/clip.webm"}\n' "$dest"
  exit 0
fi
echo "[youtube] abc: Downloading webpage"
echo "[download]  10.0% of 1.00MiB at 1.00MiB/s ETA 00:01"
echo "[download]  55.5% of 1.00MiB at 1.00MiB/s ETA 00:01"
echo "[download] 100% of 1.00MiB in 00:00:01"
printf 'webm' > "$dest/clip.webm"
"#;

/// Fake ffprobe: a 100-frame file with vp9 video and opus audio.
pub const FAKE_FFPROBE: &str = r#"
for arg in "$@"; do
  case "$arg" in
    -version) echo "ffprobe version test"; exit 0 ;;
    -count_frames) echo '{"streams":[{"nb_read_frames":"100"}]}'; exit 0 ;;
  esac
done
echo '{"streams":[{"codec_type":"video","codec_name":"vp9"},{"codec_type":"audio","codec_name":"opus"},{"codec_type":"subtitle","codec_name":"webvtt"}]}'
"#;

/// Fake ffmpeg: reports frames on stderr and writes its last argument.
pub const FAKE_FFMPEG: &str = r#"
case "$1" in -version) echo "ffmpeg version test"; exit 0 ;; esac
for arg in "$@"; do out="$arg"; done
echo "frame=50" >&2
echo "fps=25.0" >&2
echo "frame=100" >&2
echo "progress=end" >&2
printf 'mp4' > "$out"
"#;

/// Fake ffmpeg that writes partial output and then fails.
pub const FAKE_FFMPEG_FAILING: &str = r#"
case "$1" in -version) echo "ffmpeg version test"; exit 0 ;; esac
for arg in "$@"; do out="$arg"; done
echo "frame=10" >&2
printf 'partial' > "$out"
echo "Error while decoding stream #0:0: Invalid data found when processing input" >&2
exit 1
"#;
