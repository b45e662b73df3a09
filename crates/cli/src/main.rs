use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediafetch_core::{
    load_config_or_default, validate_config, DownloadRequest, FfmpegTranscoder, FfprobeInspector,
    FormatSelector, Phase, PipelineError, PipelineOrchestrator, PipelineResult, YtDlpFetcher,
};

#[derive(Parser, Debug)]
#[command(name = "mediafetch")]
#[command(version)]
#[command(about = "Download media and convert it to a widely playable codec pair")]
struct Args {
    /// Source URLs, downloaded concurrently
    #[arg(required = true)]
    urls: Vec<String>,

    /// Directory the files are written to (created if missing)
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// What to download: "audio" (mp3) or "video" (mp4)
    #[arg(short, long, default_value = "video")]
    format: String,

    /// Configuration file; defaults are used when omitted
    #[arg(short, long, env = "MEDIAFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Do not check that yt-dlp, ffprobe and ffmpeg can be run
    #[arg(long)]
    skip_validation: bool,
}

/// Outcome of one URL as shown to the user.
struct Report {
    url: String,
    result: Result<PipelineResult, PipelineError>,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every request succeeded.
async fn run() -> Result<bool> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let format: FormatSelector = args
        .format
        .parse()
        .with_context(|| format!("Invalid --format {:?}", args.format))?;

    let config = load_config_or_default(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load default configuration".to_string(),
    })?;
    validate_config(&config).context("Configuration validation failed")?;

    let orchestrator = PipelineOrchestrator::new(
        config.pipeline.clone(),
        config.policy,
        YtDlpFetcher::new(config.fetcher.clone()),
        FfprobeInspector::new(config.inspector.clone()),
        FfmpegTranscoder::new(config.transcoder.clone()),
    );

    if !args.skip_validation {
        orchestrator
            .validate()
            .await
            .context("Required tools are not available")?;
    }

    info!(
        count = args.urls.len(),
        format = %format,
        dest = %args.dest.display(),
        "Submitting downloads"
    );

    let multi = MultiProgress::new();
    let style = progress_style()?;
    let total = args.urls.len();
    let mut reports = Vec::new();
    let mut tasks = Vec::new();

    for (index, url) in args.urls.iter().enumerate() {
        let request = DownloadRequest::new(url.clone(), args.dest.clone(), format);
        let handle = match orchestrator.submit_request(request).await {
            Ok(handle) => handle,
            Err(e) => {
                reports.push(Report {
                    url: url.clone(),
                    result: Err(e),
                });
                continue;
            }
        };

        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(style.clone());
        bar.set_prefix(format!("[{}/{}]", index + 1, total));
        bar.set_message(Phase::Fetching.to_string());

        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let result = handle
                .wait_with(|event| {
                    bar.set_position(event.percent.round() as u64);
                    bar.set_message(event.phase.to_string());
                })
                .await;
            match &result {
                Ok(r) if r.is_success() => bar.finish_with_message(Phase::Done.to_string()),
                _ => bar.abandon_with_message(Phase::Failed.to_string()),
            }
            Report { url, result }
        }));
    }

    let pending = futures::future::join_all(tasks);
    tokio::pin!(pending);
    let finished = tokio::select! {
        finished = &mut pending => finished,
        _ = signal::ctrl_c() => {
            warn!("Interrupted, cancelling downloads");
            orchestrator.cancel_all().await;
            pending.await
        }
    };

    for joined in finished {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => warn!(error = %e, "Download task panicked"),
        }
    }

    let mut all_ok = reports.len() == total;
    for report in &reports {
        match &report.result {
            Ok(result) if result.is_success() => {
                let path = result
                    .final_file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("ok      {} -> {}", report.url, path);
            }
            Ok(result) => {
                all_ok = false;
                let reason = result
                    .failure_reason()
                    .map(|r| r.to_string())
                    .unwrap_or_default();
                match &result.final_file_path {
                    Some(kept) => println!("failed  {}: {} (kept {})", report.url, reason, kept.display()),
                    None => println!("failed  {}: {}", report.url, reason),
                }
            }
            Err(e) => {
                all_ok = false;
                println!("failed  {}: {}", report.url, e);
            }
        }
    }

    Ok(all_ok)
}

fn progress_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::with_template(
        "{prefix:.bold} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}% {msg}",
    )
    .context("Invalid progress bar template")?
    .progress_chars("#>-"))
}
