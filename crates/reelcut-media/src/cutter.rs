//! Parallel segment cutting with index-ordered reassembly.
//!
//! # Flow
//! 1. Fail fast when the encoder cannot run (no scratch state created)
//! 2. Reject invalid and sub-0.1s segments before dispatch
//! 3. Encode every segment on a bounded pool into an index-named scratch file
//! 4. Keep successes in original index order, regardless of completion order
//! 5. Concatenate with re-encode (or move the single survivor into place)
//!
//! The scratch directory is a [`TempDir`], so it is removed on every exit path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use reelcut_models::{CutResult, EncodingProfile, Orientation, Segment};

use crate::concat::{concat_segments, ConcatMode};
use crate::encode::{EncodeJob, EncodeMode, SegmentEncoder};
use crate::encoder::{resolve_profile, EncoderSettings};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;
use crate::resize::resize_video;
use crate::subtitles::burn_subtitles;

const SCRATCH_PREFIX: &str = "reelcut_segments_";

mod metric_names {
    pub const SEGMENT_CUTS_TOTAL: &str = "reelcut_segment_cuts_total";
}

/// Cutting pool settings.
#[derive(Debug, Clone)]
pub struct CutSettings {
    /// Maximum concurrent encoder processes
    pub workers: usize,
    /// Timeout per segment encode
    pub segment_timeout: Duration,
    /// Retry a failed re-encode once with stream copy
    pub stream_copy_fallback: bool,
    /// Parent of per-call scratch directories (system temp when `None`)
    pub scratch_root: Option<PathBuf>,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            segment_timeout: Duration::from_secs(300),
            stream_copy_fallback: false,
            scratch_root: None,
        }
    }
}

/// Outcome of a successful `cut_video` call.
#[derive(Debug, Clone)]
pub struct CutReport {
    pub output: PathBuf,
    /// Every segment's result, ordered by original index
    pub results: Vec<CutResult>,
}

impl CutReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CutResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CutResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// One warning per dropped segment.
    pub fn warnings(&self) -> Vec<String> {
        self.failed().map(CutResult::describe).collect()
    }
}

/// Cutter and concatenator bound to one resolved encoding profile.
pub struct VideoProcessor {
    encoder: Arc<dyn SegmentEncoder>,
    profile: Arc<EncodingProfile>,
    settings: CutSettings,
}

impl VideoProcessor {
    /// Probe encoder capabilities once and resolve the profile.
    ///
    /// A failed capability probe is not fatal here: the processor falls back
    /// to software encoding and `cut_video` still fails fast if the tool is
    /// missing altogether.
    pub async fn new(
        encoder: Arc<dyn SegmentEncoder>,
        encoder_settings: &EncoderSettings,
        settings: CutSettings,
    ) -> Self {
        let caps = match encoder.capabilities().await {
            Ok(caps) => caps,
            Err(e) => {
                warn!(error = %e, "Encoder capability probe failed, assuming software only");
                Default::default()
            }
        };
        let profile = resolve_profile(encoder_settings, &caps);
        Self::with_profile(encoder, profile, settings)
    }

    pub fn with_profile(
        encoder: Arc<dyn SegmentEncoder>,
        profile: EncodingProfile,
        settings: CutSettings,
    ) -> Self {
        Self {
            encoder,
            profile: Arc::new(profile),
            settings,
        }
    }

    pub fn profile(&self) -> &EncodingProfile {
        &self.profile
    }

    pub fn settings(&self) -> &CutSettings {
        &self.settings
    }

    /// Cut `segments` out of `input` and join them, in time order, into `output`.
    pub async fn cut_video(
        &self,
        input: &Path,
        segments: &[Segment],
        output: &Path,
    ) -> MediaResult<CutReport> {
        self.encoder.check_available().await?;

        let (jobs, mut results) = self.plan_jobs(input, segments);
        if jobs.is_empty() {
            return Err(all_failed(segments.len(), &results));
        }

        let scratch = self.create_scratch_dir()?;

        info!(
            input = %input.display(),
            segments = jobs.len(),
            rejected = results.len(),
            workers = self.settings.workers,
            "Cutting segments"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let futures = jobs.into_iter().map(|(segment, filename)| {
            let semaphore = semaphore.clone();
            let path = scratch.path().join(filename);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return CutResult::failure(
                        segment.index,
                        segment.start_time,
                        segment.end_time,
                        "worker pool closed",
                    );
                };
                self.cut_segment(input, &segment, path).await
            }
        });
        results.extend(join_all(futures).await);

        // Completion order is arbitrary; reassembly follows the original index
        results.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then(a.start_time.total_cmp(&b.start_time))
        });

        let successes: Vec<PathBuf> = results
            .iter()
            .filter_map(|r| r.path().cloned())
            .collect();

        for result in results.iter().filter(|r| !r.is_success()) {
            warn!(
                segment = result.index,
                error = result.error().unwrap_or_default(),
                "Segment dropped from reel"
            );
        }

        if successes.is_empty() {
            return Err(all_failed(results.len(), &results));
        }

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if successes.len() == 1 {
            move_file(&successes[0], output).await?;
        } else {
            concat_segments(
                self.encoder.as_ref(),
                &successes,
                output,
                ConcatMode::Reencode,
                &self.profile,
                scratch.path(),
            )
            .await?;
        }

        if let Err(e) = scratch.close() {
            warn!(error = %e, "Failed to remove scratch directory");
        }

        info!(
            output = %output.display(),
            succeeded = successes.len(),
            failed = results.len() - successes.len(),
            "Cut complete"
        );

        Ok(CutReport {
            output: output.to_path_buf(),
            results,
        })
    }

    /// Join existing files in the given order.
    pub async fn concat(&self, files: &[PathBuf], output: &Path, mode: ConcatMode) -> MediaResult<()> {
        let list_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or(std::env::current_dir()?);
        concat_segments(self.encoder.as_ref(), files, output, mode, &self.profile, &list_dir).await
    }

    /// Resize for `orientation`; `false` when no resize was needed.
    pub async fn resize(&self, input: &Path, output: &Path, orientation: Orientation) -> MediaResult<bool> {
        resize_video(self.encoder.as_ref(), input, output, orientation, &self.profile).await
    }

    /// Burn `subtitles` into `input`, writing `output` with the resolved profile.
    pub async fn burn_subtitles(&self, input: &Path, subtitles: &Path, output: &Path) -> MediaResult<()> {
        burn_subtitles(self.encoder.as_ref(), input, subtitles, output, &self.profile).await
    }

    /// Fail if the encoder tool cannot be invoked.
    pub async fn check_available(&self) -> MediaResult<()> {
        self.encoder.check_available().await
    }

    /// Split segments into dispatchable jobs and pre-dispatch rejections.
    fn plan_jobs(&self, input: &Path, segments: &[Segment]) -> (Vec<(Segment, String)>, Vec<CutResult>) {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        let mut rejected = Vec::new();

        for segment in segments {
            if let Err(e) = segment.validate() {
                rejected.push(CutResult::failure(
                    segment.index,
                    segment.start_time,
                    segment.end_time,
                    format!("rejected before dispatch: {}", e),
                ));
                continue;
            }
            if !seen.insert(segment.index) {
                rejected.push(CutResult::failure(
                    segment.index,
                    segment.start_time,
                    segment.end_time,
                    "rejected before dispatch: duplicate segment index",
                ));
                continue;
            }
            jobs.push((segment.clone(), segment_filename(segment.index)));
        }

        if !rejected.is_empty() {
            warn!(
                input = %input.display(),
                rejected = rejected.len(),
                "Rejected segments before dispatch"
            );
        }
        (jobs, rejected)
    }

    fn create_scratch_dir(&self) -> MediaResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.settings.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn cut_segment(&self, input: &Path, segment: &Segment, path: PathBuf) -> CutResult {
        let mut job = EncodeJob {
            index: segment.index,
            input: input.to_path_buf(),
            start: segment.start_time,
            duration: segment.end_time - segment.start_time,
            output: path,
            mode: EncodeMode::Reencode,
        };

        let mut outcome = self.run_job(&job).await;
        if let Err(e) = &outcome {
            if self.settings.stream_copy_fallback {
                warn!(
                    segment = segment.index,
                    error = %e,
                    "Re-encode failed, retrying with stream copy"
                );
                job.mode = EncodeMode::StreamCopy;
                outcome = self.run_job(&job).await;
            }
        }

        let result = match outcome {
            Ok(()) => CutResult::success(segment.index, segment.start_time, segment.end_time, job.output),
            Err(e) => CutResult::failure(segment.index, segment.start_time, segment.end_time, e.diagnostic()),
        };

        let outcome_label = if result.is_success() { "success" } else { "failure" };
        metrics::counter!(metric_names::SEGMENT_CUTS_TOTAL, "outcome" => outcome_label).increment(1);
        result
    }

    /// Encode with the per-segment timeout and verify the output is non-empty.
    async fn run_job(&self, job: &EncodeJob) -> MediaResult<()> {
        let timeout = self.settings.segment_timeout;
        match tokio::time::timeout(timeout, self.encoder.encode(job, &self.profile)).await {
            Err(_) => return Err(MediaError::Timeout(timeout.as_secs().max(1))),
            Ok(result) => result?,
        }

        let size = tokio::fs::metadata(&job.output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(MediaError::EmptyOutput(job.output.clone()));
        }
        Ok(())
    }
}

fn segment_filename(index: usize) -> String {
    format!("segment_{:04}.mp4", index)
}

fn all_failed(attempted: usize, results: &[CutResult]) -> MediaError {
    MediaError::AllSegmentsFailed {
        attempted,
        errors: results.iter().map(CutResult::describe).collect(),
    }
}
