//! reelcut command-line entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_media::{check_ffmpeg, check_ffprobe};
use reelcut_models::{BatchItem, EncoderPreference, Orientation, ProcessOutcome};
use reelcut_worker::{discover_inputs, PipelineConfig, Workflow};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "reelcut: turn long videos into highlight reels",
    long_about = "Scores fixed windows of each input on audio and motion interest, \
                  selects the best ones for a target length and stitches them back together."
)]
struct Cli {
    /// Input video files or directories
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Directory where reels are written
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// JSON config file (defaults, then this file, then flags)
    #[arg(short, long, value_name = "FILE", env = "REELCUT_CONFIG")]
    config: Option<PathBuf>,

    /// Scan input directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Minimum reel length in seconds
    #[arg(long, value_name = "SECS")]
    target_min: Option<f64>,

    /// Maximum reel length in seconds
    #[arg(long, value_name = "SECS")]
    target_max: Option<f64>,

    /// Length of each scored window in seconds
    #[arg(long, value_name = "SECS")]
    segment_duration: Option<f64>,

    /// Videos processed concurrently
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Encoder: software, auto, nvenc, qsv, amf, videotoolbox
    #[arg(long)]
    encoder: Option<EncoderPreference>,

    /// CRF-style quality, 0-51 (lower is better)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    quality: Option<u8>,

    /// Output orientation: original, landscape, portrait
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Retry failed segment re-encodes with stream copy
    #[arg(long)]
    stream_copy_fallback: bool,

    /// Keep generated subtitles as a sidecar file instead of rendering them
    #[arg(long)]
    no_burn_subtitles: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(v) = self.target_min {
            config.target_min_duration = v;
        }
        if let Some(v) = self.target_max {
            config.target_max_duration = v;
        }
        if let Some(v) = self.segment_duration {
            config.segment_duration = v;
        }
        if let Some(v) = self.workers {
            config.batch_workers = v;
        }
        if let Some(v) = self.encoder {
            config.encoder = v;
        }
        if let Some(v) = self.quality {
            config.quality = v;
        }
        if let Some(v) = self.orientation {
            config.orientation = v;
        }
        if self.stream_copy_fallback {
            config.stream_copy_fallback = true;
        }
        if self.no_burn_subtitles {
            config.burn_subtitles = false;
        }
        config.sanitized()
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reelcut=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::from_env(),
    };
    let config = Arc::new(cli.apply(base));
    info!(?config, "Starting reelcut");

    // Missing tools fail the whole run before any scratch state exists
    check_ffmpeg().context("ffmpeg is required")?;
    check_ffprobe().context("ffprobe is required")?;

    let inputs = discover_inputs(&cli.inputs, cli.recursive);
    if inputs.is_empty() {
        bail!("no supported video files found");
    }

    let workflow = Workflow::with_ffmpeg(config).await;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight videos");
            signal_token.cancel();
        }
    });

    let report = workflow.process_batch(inputs, cancel).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for item in &report.items {
            match item {
                BatchItem::Processed(result) => match &result.outcome {
                    ProcessOutcome::Success {
                        output_path,
                        highlights,
                        warnings,
                        ..
                    } => {
                        println!(
                            "OK      {} -> {} ({} segments, {:.1}s)",
                            result.input_path.display(),
                            output_path.display(),
                            highlights.segment_count,
                            highlights.total_duration
                        );
                        for warning in warnings {
                            println!("        warning: {}", warning);
                        }
                    }
                    ProcessOutcome::Failure { stage, diagnostic } => {
                        println!(
                            "FAILED  {} [{}] {}",
                            result.input_path.display(),
                            stage,
                            diagnostic
                        );
                    }
                },
                BatchItem::Skipped { input_path } => {
                    println!("SKIPPED {}", input_path.display());
                }
            }
        }
        println!(
            "{} succeeded, {} failed, {} skipped",
            report.succeeded, report.failed, report.skipped
        );
    }

    if report.failed > 0 || report.cancelled {
        error!(failed = report.failed, cancelled = report.cancelled, "Batch incomplete");
        std::process::exit(1);
    }
    Ok(())
}
