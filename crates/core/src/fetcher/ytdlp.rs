//! yt-dlp based fetcher implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Instant, SystemTime};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::FetcherConfig;
use super::error::FetcherError;
use super::progress::parse_download_percent;
use super::traits::Fetcher;
use super::types::{FetchJob, FetchOutput, FetchProgress, FormatSelector};

/// Number of stderr lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// Prefix of the per-job scratch directory inside the destination.
const TEMP_DIR_PREFIX: &str = ".mediafetch-";

/// Scratch subdirectory yt-dlp writes the finished file into.
const OUTPUT_SUBDIR: &str = "output";

/// Scratch subdirectory for fragments and partial files.
const PARTS_SUBDIR: &str = "parts";

/// Subset of yt-dlp's JSON metadata used to locate the written file.
#[derive(Debug, Deserialize)]
struct MediaMetadata {
    title: Option<String>,
    ext: Option<String>,
    filename: Option<String>,
    #[serde(rename = "_filename")]
    legacy_filename: Option<String>,
}

/// Fetcher that shells out to yt-dlp.
pub struct YtDlpFetcher {
    config: FetcherConfig,
}

impl YtDlpFetcher {
    /// Creates a new yt-dlp fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    /// Per-job scratch directory inside the destination.
    ///
    /// yt-dlp only ever writes below this directory; the finished file is
    /// moved into the destination once the download has succeeded.
    pub fn temp_dir(job: &FetchJob) -> PathBuf {
        job.dest_dir.join(format!("{}{}", TEMP_DIR_PREFIX, job.job_id))
    }

    fn output_dir(job: &FetchJob) -> PathBuf {
        Self::temp_dir(job).join(OUTPUT_SUBDIR)
    }

    fn parts_dir(job: &FetchJob) -> PathBuf {
        Self::temp_dir(job).join(PARTS_SUBDIR)
    }

    /// Arguments shared by the download and the metadata query, so both
    /// resolve the same output filename.
    fn common_args(&self, job: &FetchJob) -> Vec<String> {
        let mut args = match job.format {
            FormatSelector::AudioOnly => vec![
                "-f".to_string(),
                self.config.audio_selection.clone(),
                "-x".to_string(),
                "--audio-format".to_string(),
                self.config.audio_format.clone(),
                "--audio-quality".to_string(),
                self.config.audio_quality.clone(),
            ],
            FormatSelector::MuxedVideo => vec![
                "-f".to_string(),
                self.config.video_format.clone(),
                "--merge-output-format".to_string(),
                self.config.merge_output_format.clone(),
            ],
        };

        args.extend([
            "--no-playlist".to_string(),
            "-P".to_string(),
            Self::output_dir(job).to_string_lossy().to_string(),
            "-P".to_string(),
            format!("temp:{}", Self::parts_dir(job).to_string_lossy()),
            "-o".to_string(),
            self.config.output_template.clone(),
        ]);

        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    /// Builds yt-dlp arguments for the download itself.
    fn build_download_args(&self, job: &FetchJob) -> Vec<String> {
        let mut args = self.common_args(job);
        args.push("--newline".to_string());
        args.push("--".to_string());
        args.push(job.url.clone());
        args
    }

    /// Builds yt-dlp arguments for the post-download metadata query.
    fn build_metadata_args(&self, job: &FetchJob) -> Vec<String> {
        let mut args = self.common_args(job);
        args.extend([
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--".to_string(),
            job.url.clone(),
        ]);
        args
    }

    fn not_found_or_io(&self, e: std::io::Error) -> FetcherError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetcherError::YtDlpNotFound {
                path: self.config.ytdlp_path.clone(),
            }
        } else {
            FetcherError::Io(e)
        }
    }

    /// Derives the expected output path, inside the job's scratch output
    /// directory, from yt-dlp metadata.
    ///
    /// Audio extraction rewrites the extension after the metadata is
    /// computed, so audio-only jobs get the configured audio extension.
    fn candidate_path(&self, job: &FetchJob, meta: &MediaMetadata) -> Option<PathBuf> {
        let name = match meta.filename.as_ref().or(meta.legacy_filename.as_ref()) {
            Some(filename) => PathBuf::from(Path::new(filename).file_name()?),
            None => {
                let title = meta.title.as_ref()?;
                let ext = meta.ext.as_deref().unwrap_or(&self.config.merge_output_format);
                PathBuf::from(format!("{}.{}", title, ext))
            }
        };

        let mut path = Self::output_dir(job).join(name);
        if job.format == FormatSelector::AudioOnly {
            path.set_extension(&self.config.audio_format);
        }
        Some(path)
    }

    async fn query_metadata(
        &self,
        job: &FetchJob,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetcherError> {
        let output = Command::new(&self.config.ytdlp_path)
            .args(self.build_metadata_args(job))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(FetcherError::Cancelled),
            output = output => output.map_err(|e| self.not_found_or_io(e))?,
        };

        if !output.status.success() {
            return Err(FetcherError::metadata_failed(format!(
                "yt-dlp exited with code: {:?}",
                output.status.code()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| FetcherError::metadata_failed(format!("invalid JSON: {}", e)))
    }

    /// Locates the file the download produced in the job's scratch output
    /// directory.
    async fn resolve_output(
        &self,
        job: &FetchJob,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, Option<String>), FetcherError> {
        let mut title = None;
        let mut expected = None;

        match self.query_metadata(job, cancel).await {
            Ok(meta) => {
                expected = self.candidate_path(job, &meta);
                title = meta.title;
            }
            Err(FetcherError::Cancelled) => return Err(FetcherError::Cancelled),
            Err(e) => warn!(job_id = %job.job_id, error = %e, "Metadata query failed, scanning scratch output"),
        }

        if let Some(path) = &expected {
            if tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
                return Ok((path.clone(), title));
            }
            debug!(job_id = %job.job_id, expected = %path.display(), "Expected output missing, scanning scratch output");
        }

        match newest_file(&Self::output_dir(job)).await? {
            Some(path) => Ok((path, title)),
            None => Err(FetcherError::OutputNotFound {
                path: expected.unwrap_or_else(|| Self::output_dir(job)),
            }),
        }
    }

    async fn run_fetch(
        &self,
        job: &FetchJob,
        progress_tx: mpsc::Sender<FetchProgress>,
        cancel: CancellationToken,
    ) -> Result<FetchOutput, FetcherError> {
        let start = Instant::now();
        tokio::fs::create_dir_all(Self::output_dir(job)).await?;

        let args = self.build_download_args(job);
        debug!(job_id = %job.job_id, ?args, "Running yt-dlp");

        let mut command = Command::new(&self.config.ytdlp_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // yt-dlp leads its own group so the ffmpeg it spawns is killed with it
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(|e| self.not_found_or_io(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetcherError::download_failed("yt-dlp stdout was not captured", None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetcherError::download_failed("yt-dlp stderr was not captured", None))?;

        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        });

        let mut reader = BufReader::new(stdout).lines();
        let mut last_percent: Option<f32> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id = %job.job_id, "Fetch cancelled, stopping yt-dlp");
                    kill_process_group(&mut child).await;
                    stderr_task.abort();
                    return Err(FetcherError::Cancelled);
                }
                line = reader.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break,
                        Err(e) => {
                            kill_process_group(&mut child).await;
                            stderr_task.abort();
                            return Err(FetcherError::Io(e));
                        }
                    };

                    if let Some(percent) = parse_download_percent(&line) {
                        if last_percent != Some(percent) {
                            last_percent = Some(percent);
                            let _ = progress_tx.try_send(FetchProgress {
                                job_id: job.job_id.clone(),
                                percent,
                            });
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                kill_process_group(&mut child).await;
                stderr_task.abort();
                return Err(FetcherError::Cancelled);
            }
            status = child.wait() => status?,
        };
        let tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr = if tail.is_empty() {
                None
            } else {
                Some(Vec::from(tail).join("\n"))
            };
            return Err(FetcherError::download_failed(
                format!("yt-dlp exited with code: {:?}", status.code()),
                stderr,
            ));
        }

        let (scratch_path, title) = self.resolve_output(job, &cancel).await?;
        let file_path = move_into_destination(&scratch_path, &job.dest_dir).await?;
        debug!(job_id = %job.job_id, from = %scratch_path.display(), to = %file_path.display(), "Moved output into destination");
        let size_bytes = tokio::fs::metadata(&file_path).await?.len();

        Ok(FetchOutput {
            job_id: job.job_id.clone(),
            file_path,
            title,
            size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn remove_temp_dir(&self, job: &FetchJob) {
        let temp_dir = Self::temp_dir(job);
        match tokio::fs::remove_dir_all(&temp_dir).await {
            Ok(()) => debug!(path = %temp_dir.display(), "Removed fetch scratch directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %temp_dir.display(), error = %e, "Failed to remove fetch scratch directory"),
        }
    }
}

/// Kills yt-dlp together with every process in its group.
async fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: killpg only sends a signal; the group was created at spawn
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
    let _ = child.kill().await;
}

/// Lists the regular files directly inside `dir`.
async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, FetcherError> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Returns the most recently modified file in `dir`.
///
/// Hidden files and leftover `.part` files are ignored.
async fn newest_file(dir: &Path) -> Result<Option<PathBuf>, FetcherError> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for path in list_files(dir).await? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') || name.ends_with(".part") {
            continue;
        }
        let modified = tokio::fs::metadata(&path)
            .await?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// `name` for `n == 0`, otherwise `stem (n).ext`.
fn numbered_name(name: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return name.to_path_buf();
    }
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.extension() {
        Some(ext) => PathBuf::from(format!("{} ({}).{}", stem, n, ext.to_string_lossy())),
        None => PathBuf::from(format!("{} ({})", stem, n)),
    }
}

/// Moves a finished download out of the scratch directory, never
/// replacing an existing file.
///
/// Linking claims the target name atomically, so concurrent requests
/// producing the same name end up with distinct files.
async fn move_into_destination(scratch_path: &Path, dest_dir: &Path) -> Result<PathBuf, FetcherError> {
    let name = scratch_path
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| FetcherError::OutputNotFound {
            path: scratch_path.to_path_buf(),
        })?;

    let mut n = 0;
    loop {
        let target = dest_dir.join(numbered_name(&name, n));
        match tokio::fs::hard_link(scratch_path, &target).await {
            Ok(()) => {
                tokio::fs::remove_file(scratch_path).await?;
                return Ok(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                debug!(error = %e, "Hard link unavailable, renaming instead");
                match tokio::fs::try_exists(&target).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::fs::rename(scratch_path, &target).await?;
                        return Ok(target);
                    }
                    Err(_) => return Err(FetcherError::Io(e)),
                }
            }
        }
        n += 1;
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(
        &self,
        job: &FetchJob,
        progress_tx: mpsc::Sender<FetchProgress>,
        cancel: CancellationToken,
    ) -> Result<FetchOutput, FetcherError> {
        info!(
            job_id = %job.job_id,
            url = %job.url,
            format = %job.format,
            dest = %job.dest_dir.display(),
            "Starting fetch"
        );

        let result = self.run_fetch(job, progress_tx, cancel).await;
        self.remove_temp_dir(job).await;

        match &result {
            Ok(output) => info!(
                job_id = %job.job_id,
                file = %output.file_path.display(),
                size_bytes = output.size_bytes,
                duration_ms = output.duration_ms,
                "Fetch completed"
            ),
            Err(FetcherError::Cancelled) => {}
            Err(e) => warn!(job_id = %job.job_id, error = %e, "Fetch failed"),
        }
        result
    }

    async fn validate(&self) -> Result<(), FetcherError> {
        let status = Command::new(&self.config.ytdlp_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.not_found_or_io(e))?;

        if !status.success() {
            return Err(FetcherError::download_failed(
                format!("yt-dlp --version exited with code: {:?}", status.code()),
                None,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job(dest: &Path, format: FormatSelector) -> FetchJob {
        FetchJob {
            job_id: "req-1".to_string(),
            url: "https://example.com/watch?v=abc".to_string(),
            dest_dir: dest.to_path_buf(),
            format,
        }
    }

    fn meta(json: &str) -> MediaMetadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_download_args_video() {
        let fetcher = YtDlpFetcher::with_defaults();
        let args = fetcher.build_download_args(&job(Path::new("/out"), FormatSelector::MuxedVideo));

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best");
        let merge = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[merge + 1], "mp4");
        assert!(!args.contains(&"-x".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        let home = args.iter().position(|a| a == "-P").unwrap();
        assert_eq!(args[home + 1], "/out/.mediafetch-req-1/output");
        assert!(args.contains(&"temp:/out/.mediafetch-req-1/parts".to_string()));
        assert_eq!(&args[args.len() - 2..], &["--", "https://example.com/watch?v=abc"]);
    }

    #[test]
    fn test_download_args_audio() {
        let fetcher = YtDlpFetcher::with_defaults();
        let args = fetcher.build_download_args(&job(Path::new("/out"), FormatSelector::AudioOnly));

        assert!(args.contains(&"-x".to_string()));
        let fmt = args.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(args[fmt + 1], "mp3");
        let quality = args.iter().position(|a| a == "--audio-quality").unwrap();
        assert_eq!(args[quality + 1], "192K");
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn test_metadata_args_skip_download() {
        let fetcher = YtDlpFetcher::with_defaults();
        let args = fetcher.build_metadata_args(&job(Path::new("/out"), FormatSelector::MuxedVideo));
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--skip-download".to_string()));
        assert!(!args.contains(&"--newline".to_string()));
    }

    #[test]
    fn test_candidate_path_from_filename() {
        let fetcher = YtDlpFetcher::with_defaults();
        let j = job(Path::new("/out"), FormatSelector::MuxedVideo);
        let m = meta(
            r#"{"title": "Clip", "ext": "mp4", "filename": "/out/.mediafetch-req-1/output/Clip.mp4"}"#,
        );
        assert_eq!(
            fetcher.candidate_path(&j, &m),
            Some(PathBuf::from("/out/.mediafetch-req-1/output/Clip.mp4"))
        );
    }

    #[test]
    fn test_candidate_path_audio_uses_extracted_extension() {
        let fetcher = YtDlpFetcher::with_defaults();
        let j = job(Path::new("/out"), FormatSelector::AudioOnly);
        let m = meta(r#"{"title": "Song", "ext": "webm", "_filename": "Song.webm"}"#);
        assert_eq!(
            fetcher.candidate_path(&j, &m),
            Some(PathBuf::from("/out/.mediafetch-req-1/output/Song.mp3"))
        );
    }

    #[test]
    fn test_candidate_path_from_title() {
        let fetcher = YtDlpFetcher::with_defaults();
        let j = job(Path::new("/out"), FormatSelector::MuxedVideo);
        let m = meta(r#"{"title": "Clip", "ext": "webm"}"#);
        assert_eq!(
            fetcher.candidate_path(&j, &m),
            Some(PathBuf::from("/out/.mediafetch-req-1/output/Clip.webm"))
        );

        let m = meta(r#"{"id": "abc"}"#);
        assert_eq!(fetcher.candidate_path(&j, &m), None);
    }

    #[tokio::test]
    async fn test_newest_file_ignores_hidden_and_partial() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.mp4.part"), b"partial").unwrap();
        std::fs::write(dir.path().join(".hidden"), b"x").unwrap();
        assert_eq!(newest_file(dir.path()).await.unwrap(), None);

        std::fs::write(dir.path().join("clip.mp4"), b"new").unwrap();
        assert_eq!(
            newest_file(dir.path()).await.unwrap(),
            Some(dir.path().join("clip.mp4"))
        );
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name(Path::new("clip.mp4"), 0), PathBuf::from("clip.mp4"));
        assert_eq!(numbered_name(Path::new("clip.mp4"), 2), PathBuf::from("clip (2).mp4"));
        assert_eq!(numbered_name(Path::new("clip"), 1), PathBuf::from("clip (1)"));
    }

    #[tokio::test]
    async fn test_move_into_destination_never_replaces() {
        let dest = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(dest.path().join("clip.mp4"), b"existing").unwrap();
        std::fs::write(dest.path().join("clip (1).mp4"), b"existing").unwrap();

        let fetched = scratch.path().join("clip.mp4");
        std::fs::write(&fetched, b"new").unwrap();
        let placed = move_into_destination(&fetched, dest.path()).await.unwrap();

        assert_eq!(placed, dest.path().join("clip (2).mp4"));
        assert_eq!(std::fs::read(&placed).unwrap(), b"new");
        assert_eq!(std::fs::read(dest.path().join("clip.mp4")).unwrap(), b"existing");
        assert!(!fetched.exists());
    }

    #[tokio::test]
    async fn test_fetch_missing_binary_cleans_up() {
        let dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(FetcherConfig::with_path(PathBuf::from("/nonexistent/yt-dlp")));
        let j = job(dir.path(), FormatSelector::MuxedVideo);
        std::fs::create_dir(YtDlpFetcher::temp_dir(&j)).unwrap();

        let (tx, _rx) = mpsc::channel(4);
        let result = fetcher.fetch(&j, tx, CancellationToken::new()).await;

        assert!(matches!(result, Err(FetcherError::YtDlpNotFound { .. })));
        assert!(!YtDlpFetcher::temp_dir(&j).exists());
    }

    #[tokio::test]
    async fn test_validate_missing_binary() {
        let fetcher = YtDlpFetcher::new(FetcherConfig::with_path(PathBuf::from("/nonexistent/yt-dlp")));
        let result = fetcher.validate().await;
        assert!(matches!(result, Err(FetcherError::YtDlpNotFound { .. })));
    }
}
