//! Per-video workflow and batch fan-out.
//!
//! # Stages
//! 1. validate (tool preflight, then the input file)
//! 2. probe
//! 3. extract audio (once, shared with the subtitle collaborator)
//! 4. detect highlights
//! 5. cut + concatenate
//! 6. resize (when an orientation is configured)
//! 7. subtitles (when enabled and a collaborator is installed), optionally
//!    burned into the reel
//!
//! The first failing stage ends the video with a structured failure. Scratch
//! files live in a per-video temp directory and go away with it; a reel that
//! was already moved into the output directory is removed again if a later
//! stage fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use reelcut_media::{move_file, FfmpegEncoder, SegmentEncoder, VideoProcessor};
use reelcut_models::{
    BatchItem, BatchReport, HighlightResult, ProcessOutcome, ProcessResult, ProcessStage,
    StageTiming,
};

use crate::collaborators::{FfmpegBackend, MediaBackend, SubtitleCollaborator, SubtitleRequest};
use crate::config::PipelineConfig;
use crate::error::WorkerError;
use crate::highlight::HighlightDetector;
use crate::logging::VideoLogger;

mod metric_names {
    pub const VIDEOS_TOTAL: &str = "reelcut_videos_total";
    pub const STAGE_DURATION: &str = "reelcut_stage_duration_seconds";
}

const SCRATCH_PREFIX: &str = "reelcut_video_";
const AUDIO_FILENAME: &str = "audio.pcm";

type StageError = (ProcessStage, WorkerError);

/// Everything a successful video hands back.
struct Finished {
    output_path: PathBuf,
    subtitle_path: Option<PathBuf>,
    highlights: HighlightResult,
    warnings: Vec<String>,
}

/// Stage timings of one video.
struct StageClock<'a> {
    logger: &'a VideoLogger,
    timings: Vec<StageTiming>,
}

impl StageClock<'_> {
    fn record(&mut self, stage: ProcessStage, started: Instant) {
        let seconds = started.elapsed().as_secs_f64();
        metrics::histogram!(metric_names::STAGE_DURATION, "stage" => stage.as_str()).record(seconds);
        self.logger.log_stage(stage, seconds);
        self.timings.push(StageTiming { stage, seconds });
    }
}

/// The highlight pipeline bound to one configuration.
pub struct Workflow {
    config: Arc<PipelineConfig>,
    backend: Arc<dyn MediaBackend>,
    processor: VideoProcessor,
    detector: HighlightDetector,
    subtitles: Option<Arc<dyn SubtitleCollaborator>>,
}

impl Workflow {
    /// Build the workflow; the encoder is probed once here.
    pub async fn new(
        config: Arc<PipelineConfig>,
        backend: Arc<dyn MediaBackend>,
        encoder: Arc<dyn SegmentEncoder>,
    ) -> Self {
        let processor =
            VideoProcessor::new(encoder, &config.encoder_settings(), config.cut_settings()).await;
        let detector = HighlightDetector::from_config(&config);
        Self {
            config,
            backend,
            processor,
            detector,
            subtitles: None,
        }
    }

    /// Workflow over the local FFmpeg installation.
    pub async fn with_ffmpeg(config: Arc<PipelineConfig>) -> Self {
        let backend = FfmpegBackend::new(config.ffmpeg_timeout_secs, config.probe_timeout_secs)
            .with_volume_epsilon(config.volume_epsilon);
        let encoder = FfmpegEncoder::new(config.ffmpeg_timeout_secs)
            .with_probe_timeout(config.probe_timeout_secs);
        Self::new(config, Arc::new(backend), Arc::new(encoder)).await
    }

    pub fn with_subtitles(mut self, collaborator: Arc<dyn SubtitleCollaborator>) -> Self {
        self.subtitles = Some(collaborator);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Where the reel for `input` is written.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        self.config.output_dir.join(format!("{}_highlights.mp4", stem))
    }

    /// Run every stage for one video.
    pub async fn process_video(&self, input: &Path, run_id: &str) -> ProcessResult {
        let logger = VideoLogger::new(run_id, input);
        let span = logger.create_span();
        self.process_logged(input, &logger).instrument(span).await
    }

    async fn process_logged(&self, input: &Path, logger: &VideoLogger) -> ProcessResult {
        let started_at = Utc::now();
        let started = Instant::now();
        logger.log_start();

        let mut clock = StageClock {
            logger,
            timings: Vec::new(),
        };
        let outcome = match self.run_stages(input, &mut clock).await {
            Ok(finished) => {
                for warning in &finished.warnings {
                    logger.log_warning(warning);
                }
                logger.log_completion(&finished.output_path, started.elapsed().as_secs_f64());
                ProcessOutcome::Success {
                    output_path: finished.output_path,
                    subtitle_path: finished.subtitle_path,
                    highlights: finished.highlights,
                    warnings: finished.warnings,
                }
            }
            Err((stage, error)) => {
                let diagnostic = error.diagnostic();
                logger.log_failure(stage, &diagnostic);
                ProcessOutcome::Failure { stage, diagnostic }
            }
        };

        let label = match outcome {
            ProcessOutcome::Success { .. } => "success",
            ProcessOutcome::Failure { .. } => "failure",
        };
        metrics::counter!(metric_names::VIDEOS_TOTAL, "outcome" => label).increment(1);

        ProcessResult {
            run_id: logger.run_id().to_string(),
            input_path: input.to_path_buf(),
            started_at,
            outcome,
            timings: clock.timings,
            total_seconds: started.elapsed().as_secs_f64(),
        }
    }

    async fn run_stages(&self, input: &Path, clock: &mut StageClock<'_>) -> Result<Finished, StageError> {
        let t = Instant::now();
        self.check_tools()
            .await
            .map_err(|e| (ProcessStage::Validate, e))?;
        self.backend
            .validate(input)
            .await
            .map_err(|e| (ProcessStage::Validate, e.into()))?;
        clock.record(ProcessStage::Validate, t);

        let t = Instant::now();
        let info = self
            .backend
            .probe(input)
            .await
            .map_err(|e| (ProcessStage::Probe, e.into()))?;
        clock.record(ProcessStage::Probe, t);
        info!(
            duration = info.duration,
            width = info.width,
            height = info.height,
            fps = info.fps,
            has_audio = info.has_audio(),
            "Probed input"
        );

        let t = Instant::now();
        let scratch = self
            .create_scratch_dir()
            .map_err(|e| (ProcessStage::ExtractAudio, e))?;
        let audio = if info.has_audio() {
            let path = scratch.path().join(AUDIO_FILENAME);
            Some(
                self.backend
                    .extract_audio(input, &path)
                    .await
                    .map_err(|e| (ProcessStage::ExtractAudio, e.into()))?,
            )
        } else {
            None
        };
        clock.record(ProcessStage::ExtractAudio, t);

        let t = Instant::now();
        let scorer = self
            .backend
            .scorer(input, &info, audio.as_deref())
            .await
            .map_err(|e| (ProcessStage::Detect, e.into()))?;
        let highlights = self.detector.detect_highlights(&info, scorer.as_ref()).await;
        if !highlights.success {
            let reason = highlights
                .error
                .clone()
                .unwrap_or_else(|| "no segments selected".to_string());
            return Err((ProcessStage::Detect, WorkerError::no_highlights(reason)));
        }
        clock.record(ProcessStage::Detect, t);

        let mut warnings = Vec::new();
        if !highlights.in_target_range {
            warnings.push(format!(
                "highlight total {:.1}s outside target {:.1}-{:.1}s",
                highlights.total_duration, highlights.target.min, highlights.target.max
            ));
        }

        let t = Instant::now();
        let reel = scratch.path().join("reel.mp4");
        let report = self
            .processor
            .cut_video(input, &highlights.segments, &reel)
            .await
            .map_err(|e| (ProcessStage::Cut, e.into()))?;
        warnings.extend(report.warnings());

        let output_path = self.output_path_for(input);
        let orientation = self.config.orientation;
        if orientation.dimensions().is_none() {
            self.publish(&reel, &output_path)
                .await
                .map_err(|e| (ProcessStage::Cut, e))?;
            clock.record(ProcessStage::Cut, t);
        } else {
            clock.record(ProcessStage::Cut, t);

            let t = Instant::now();
            let resized = scratch.path().join("reel_resized.mp4");
            self.processor
                .resize(&reel, &resized, orientation)
                .await
                .map_err(|e| (ProcessStage::Resize, e.into()))?;
            self.publish(&resized, &output_path)
                .await
                .map_err(|e| (ProcessStage::Resize, e))?;
            clock.record(ProcessStage::Resize, t);
        }

        let subtitle_path = match self
            .run_subtitles(audio.as_deref(), &output_path, scratch.path(), &highlights, clock)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                remove_partial(&output_path).await;
                return Err(e);
            }
        };

        if let Err(e) = scratch.close() {
            warn!(error = %e, "Failed to remove scratch directory");
        }

        Ok(Finished {
            output_path,
            subtitle_path,
            highlights,
            warnings,
        })
    }

    async fn run_subtitles(
        &self,
        audio: Option<&Path>,
        reel: &Path,
        scratch: &Path,
        highlights: &HighlightResult,
        clock: &mut StageClock<'_>,
    ) -> Result<Option<PathBuf>, StageError> {
        if !self.config.subtitles_enabled {
            return Ok(None);
        }
        let Some(collaborator) = &self.subtitles else {
            warn!("Subtitles enabled but no subtitle collaborator installed");
            return Ok(None);
        };

        let t = Instant::now();
        let request = SubtitleRequest {
            audio,
            reel,
            time_ranges: &highlights.time_ranges,
        };
        let path = collaborator
            .generate(request)
            .await
            .map_err(|e| (ProcessStage::Subtitle, e))?;

        if let (Some(subtitles), true) = (&path, self.config.burn_subtitles) {
            let burned = scratch.join("reel_subtitled.mp4");
            self.processor
                .burn_subtitles(reel, subtitles, &burned)
                .await
                .map_err(|e| (ProcessStage::Subtitle, e.into()))?;
            self.publish(&burned, reel)
                .await
                .map_err(|e| (ProcessStage::Subtitle, e))?;
        }
        clock.record(ProcessStage::Subtitle, t);
        Ok(path)
    }

    /// Both the backend's tools and the encoder must be present before any
    /// scratch space is created or audio extracted.
    async fn check_tools(&self) -> Result<(), WorkerError> {
        self.backend.check_tools().await?;
        self.processor.check_available().await?;
        Ok(())
    }

    /// Move a finished reel into the output directory.
    async fn publish(&self, reel: &Path, output: &Path) -> Result<(), WorkerError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if let Err(e) = move_file(reel, output).await {
            remove_partial(output).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn create_scratch_dir(&self) -> Result<TempDir, WorkerError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.config.work_dir {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Process `inputs` with bounded concurrency, reporting in input order.
    ///
    /// Cancelling `cancel` stops further dispatch; videos already running
    /// finish normally and the rest are reported as skipped.
    pub async fn process_batch(&self, inputs: Vec<PathBuf>, cancel: CancellationToken) -> BatchReport {
        let run_id = VideoLogger::new_run_id();
        info!(
            run_id = %run_id,
            inputs = inputs.len(),
            workers = self.config.batch_workers,
            "Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.batch_workers.max(1)));
        let futures = inputs.into_iter().map(|input| {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let run_id = run_id.as_str();
            async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire() => permit.ok(),
                };
                match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        BatchItem::Processed(self.process_video(&input, run_id).await)
                    }
                    _ => {
                        info!(input = %input.display(), "Batch cancelled, skipping input");
                        BatchItem::Skipped { input_path: input }
                    }
                }
            }
        });

        let items = join_all(futures).await;
        let report = BatchReport::new(items, cancel.is_cancelled());
        info!(
            run_id = %run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "Batch complete"
        );
        report
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => warn!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
