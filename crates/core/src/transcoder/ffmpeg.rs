//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::capabilities::EncoderCapabilities;
use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::progress::{frame_percent, parse_frame, parse_frame_count};
use super::traits::Transcoder;
use super::types::{
    EncoderPreference, TranscodeJob, TranscodeProgress, TranscodeResult, VideoCodec,
};

/// Number of stderr error lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
    capabilities: OnceCell<EncoderCapabilities>,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self {
            config,
            capabilities: OnceCell::new(),
        }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Returns the final and in-progress output paths for an input file.
    ///
    /// The in-progress path carries a `.part.` infix so a failed transcode
    /// can never be mistaken for a finished one.
    pub fn output_paths(&self, input_path: &Path) -> (PathBuf, PathBuf) {
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let ext = self.config.container.extension();
        let dir = input_path.parent().unwrap_or_else(|| Path::new(""));

        let final_path = dir.join(format!("{}{}.{}", stem, self.config.output_suffix, ext));
        let partial_path = dir.join(format!("{}{}.part.{}", stem, self.config.output_suffix, ext));
        (final_path, partial_path)
    }

    /// Picks the ffmpeg video encoder according to the configured preference.
    async fn video_encoder(&self, codec: VideoCodec) -> Result<String, TranscoderError> {
        if self.config.encoder == EncoderPreference::Software {
            return Ok(codec.software_encoder().to_string());
        }

        let caps = self
            .capabilities
            .get_or_init(|| EncoderCapabilities::detect(&self.config))
            .await;

        match (caps.hardware_encoder_for(codec), self.config.encoder) {
            (Some(encoder), _) => Ok(encoder.to_string()),
            (None, EncoderPreference::Hardware) => Err(TranscoderError::EncoderUnavailable {
                codec: codec.to_string(),
                reason: "no hardware encoder reported by ffmpeg".to_string(),
            }),
            (None, _) => {
                debug!(codec = %codec, "No hardware encoder found, using software encoder");
                Ok(codec.software_encoder().to_string())
            }
        }
    }

    /// Builds ffmpeg arguments for a transcode.
    fn build_args(
        &self,
        job: &TranscodeJob,
        video_encoder: &str,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "-c:v".to_string(),
            video_encoder.to_string(),
            "-c:a".to_string(),
            job.audio_codec.encoder().to_string(),
        ];

        if self.config.container.extension() == "mp4" {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-nostats".to_string(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Counts the frames of the first video stream.
    ///
    /// Returns `None` when the count cannot be determined; progress then stays
    /// indeterminate instead of failing the transcode.
    async fn count_frames(&self, input_path: &Path) -> Option<u64> {
        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_frames",
                "-show_entries",
                "stream=nb_read_frames",
                "-of",
                "json",
            ])
            .arg(input_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => {
                let count = parse_frame_count(&String::from_utf8_lossy(&o.stdout));
                if count.is_none() {
                    warn!(input = %input_path.display(), "Frame count unavailable, progress will be indeterminate");
                }
                count
            }
            Ok(o) => {
                warn!(
                    input = %input_path.display(),
                    code = ?o.status.code(),
                    "Frame count probe failed, progress will be indeterminate"
                );
                None
            }
            Err(e) => {
                warn!(input = %input_path.display(), error = %e, "Could not run frame count probe");
                None
            }
        }
    }

    /// Removes the in-progress output unless configured to keep it.
    async fn discard_partial(&self, partial_path: &Path) {
        if self.config.retain_partial_output {
            return;
        }
        match tokio::fs::remove_file(partial_path).await {
            Ok(()) => debug!(path = %partial_path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %partial_path.display(), error = %e, "Failed to remove partial output"),
        }
    }

    /// Runs the transcode with progress reporting.
    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
        cancel: CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        let start = Instant::now();

        if !job.input_path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let video_encoder = self.video_encoder(job.video_codec).await?;
        let (output_path, partial_path) = self.output_paths(&job.input_path);

        // Get total frames for progress calculation
        let total_frames = tokio::select! {
            _ = cancel.cancelled() => return Err(TranscoderError::Cancelled),
            count = self.count_frames(&job.input_path) => count,
        };

        let args = self.build_args(job, &video_encoder, &partial_path);
        debug!(job_id = %job.job_id, ?args, "Running ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscoderError::transcode_failed("ffmpeg stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let mut last_frame = None;
        let mut error_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id = %job.job_id, "Transcode cancelled, stopping ffmpeg");
                    let _ = child.kill().await;
                    self.discard_partial(&partial_path).await;
                    return Err(TranscoderError::Cancelled);
                }
                line = reader.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => {
                            let _ = child.kill().await;
                            self.discard_partial(&partial_path).await;
                            return Err(TranscoderError::Io(e));
                        }
                    };

                    if let Some(frame) = parse_frame(&line) {
                        if last_frame != Some(frame) {
                            last_frame = Some(frame);
                            // Non-blocking send
                            let _ = progress_tx.try_send(TranscodeProgress {
                                job_id: job.job_id.clone(),
                                frame,
                                total_frames,
                                percent: frame_percent(frame, total_frames),
                            });
                        }
                    } else if !line.contains('=') {
                        // Anything that is not a key=value progress line is diagnostics
                        if error_tail.len() == STDERR_TAIL_LINES {
                            error_tail.pop_front();
                        }
                        error_tail.push_back(line);
                    }
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            self.discard_partial(&partial_path).await;
            let stderr = if error_tail.is_empty() {
                None
            } else {
                Some(Vec::from(error_tail).join("\n"))
            };
            return Err(TranscoderError::transcode_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                stderr,
            ));
        }

        let output_meta = tokio::fs::metadata(&partial_path)
            .await
            .map_err(|_| TranscoderError::transcode_failed("Output file not created", None))?;
        tokio::fs::rename(&partial_path, &output_path).await?;

        if let Err(e) = tokio::fs::remove_file(&job.input_path).await {
            warn!(
                job_id = %job.job_id,
                input = %job.input_path.display(),
                error = %e,
                "Transcode succeeded but the input file could not be removed"
            );
        }

        Ok(TranscodeResult {
            job_id: job.job_id.clone(),
            output_path,
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            video_encoder,
        })
    }

    /// Checks that a binary runs `-version` successfully.
    async fn check_binary(
        path: &Path,
        not_found: impl FnOnce() -> TranscoderError,
    ) -> Result<(), TranscoderError> {
        let status = Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    not_found()
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        if !status.success() {
            return Err(TranscoderError::transcode_failed(
                format!("{} -version exited with code: {:?}", path.display(), status.code()),
                None,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(
        &self,
        job: TranscodeJob,
        progress_tx: mpsc::Sender<TranscodeProgress>,
        cancel: CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        info!(
            job_id = %job.job_id,
            input = %job.input_path.display(),
            video = %job.video_codec,
            audio = %job.audio_codec,
            "Starting transcode"
        );
        let result = self.run_transcode(&job, progress_tx, cancel).await;
        match &result {
            Ok(r) => info!(
                job_id = %job.job_id,
                output = %r.output_path.display(),
                duration_ms = r.duration_ms,
                "Transcode completed"
            ),
            Err(TranscoderError::Cancelled) => {}
            Err(e) => warn!(job_id = %job.job_id, error = %e, "Transcode failed"),
        }
        result
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        Self::check_binary(&self.config.ffmpeg_path, || TranscoderError::FfmpegNotFound {
            path: self.config.ffmpeg_path.clone(),
        })
        .await?;
        Self::check_binary(&self.config.ffprobe_path, || TranscoderError::FfprobeNotFound {
            path: self.config.ffprobe_path.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::{AudioCodec, ContainerFormat};

    fn job(input: &str) -> TranscodeJob {
        TranscodeJob {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from(input),
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
        }
    }

    #[test]
    fn test_output_paths() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let (output, partial) = transcoder.output_paths(Path::new("/out/My Clip.webm"));
        assert_eq!(output, PathBuf::from("/out/My Clip_converted.mp4"));
        assert_eq!(partial, PathBuf::from("/out/My Clip_converted.part.mp4"));
    }

    #[test]
    fn test_output_paths_custom_container() {
        let transcoder =
            FfmpegTranscoder::new(TranscoderConfig::default().with_container(ContainerFormat::Mkv));
        let (output, _) = transcoder.output_paths(Path::new("/out/clip.mp4"));
        assert_eq!(output, PathBuf::from("/out/clip_converted.mkv"));
    }

    #[test]
    fn test_build_args() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let args = transcoder.build_args(
            &job("/out/clip.webm"),
            "libx264",
            Path::new("/out/clip_converted.part.mp4"),
        );

        assert_eq!(&args[..4], &["-y", "-hide_banner", "-i", "/out/clip.webm"]);
        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[cv + 1], "libx264");
        let ca = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[ca + 1], "aac");
        assert!(args.contains(&"+faststart".to_string()));
        assert!(args.contains(&"pipe:2".to_string()));
        assert_eq!(args.last().unwrap(), "/out/clip_converted.part.mp4");
    }

    #[test]
    fn test_build_args_extra_before_output() {
        let mut config = TranscoderConfig::default();
        config.extra_ffmpeg_args = vec!["-preset".to_string(), "fast".to_string()];
        let transcoder = FfmpegTranscoder::new(config);
        let args = transcoder.build_args(&job("/in.webm"), "libx264", Path::new("/out.mp4"));

        let n = args.len();
        assert_eq!(&args[n - 3..], &["-preset", "fast", "/out.mp4"]);
    }

    #[tokio::test]
    async fn test_software_encoder_skips_detection() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let encoder = transcoder.video_encoder(VideoCodec::H264).await.unwrap();
        assert_eq!(encoder, "libx264");
        assert!(transcoder.capabilities.get().is_none());
    }

    #[tokio::test]
    async fn test_hardware_encoder_required_but_missing() {
        let config = TranscoderConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        )
        .with_encoder(EncoderPreference::Hardware);
        let transcoder = FfmpegTranscoder::new(config);

        let result = transcoder.video_encoder(VideoCodec::H264).await;
        assert!(matches!(result, Err(TranscoderError::EncoderUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_auto_encoder_falls_back_to_software() {
        let config = TranscoderConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        )
        .with_encoder(EncoderPreference::Auto);
        let transcoder = FfmpegTranscoder::new(config);

        let encoder = transcoder.video_encoder(VideoCodec::Hevc).await.unwrap();
        assert_eq!(encoder, "libx265");
    }

    #[tokio::test]
    async fn test_transcode_missing_input() {
        let transcoder = FfmpegTranscoder::with_defaults();
        let (tx, _rx) = mpsc::channel(4);
        let result = transcoder
            .transcode(job("/nonexistent/input.webm"), tx, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(TranscoderError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_validate_missing_ffmpeg() {
        let transcoder = FfmpegTranscoder::new(TranscoderConfig::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        ));
        let result = transcoder.validate().await;
        assert!(matches!(result, Err(TranscoderError::FfmpegNotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_rejects_failing_binaries() {
        let transcoder = FfmpegTranscoder::new(TranscoderConfig::with_paths(
            PathBuf::from("false"),
            PathBuf::from("true"),
        ));
        assert!(matches!(
            transcoder.validate().await,
            Err(TranscoderError::TranscodeFailed { .. })
        ));

        let transcoder = FfmpegTranscoder::new(TranscoderConfig::with_paths(
            PathBuf::from("true"),
            PathBuf::from("false"),
        ));
        match transcoder.validate().await {
            Err(TranscoderError::TranscodeFailed { reason, .. }) => assert!(reason.starts_with("false")),
            other => panic!("unexpected result: {:?}", other),
        }

        let transcoder = FfmpegTranscoder::new(TranscoderConfig::with_paths(
            PathBuf::from("true"),
            PathBuf::from("true"),
        ));
        assert!(transcoder.validate().await.is_ok());
    }
}
