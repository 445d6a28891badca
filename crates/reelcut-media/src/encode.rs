//! External encoder seam.
//!
//! The cutter talks to the encoder only through [`SegmentEncoder`], so the
//! parallel orchestration can be exercised without FFmpeg installed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use reelcut_models::EncodingProfile;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::concat::ConcatMode;
use crate::encoder::{probe_encoders, EncoderCapabilities};
use crate::error::MediaResult;
use crate::resize::scale_pad_filter;
use crate::subtitles::subtitles_filter;

/// How a segment is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Full transcode with the resolved profile
    Reencode,
    /// Re-mux without re-encoding
    StreamCopy,
}

/// One trim job: `[start, start + duration)` of `input` into `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub index: usize,
    pub input: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub output: PathBuf,
    pub mode: EncodeMode,
}

#[async_trait]
pub trait SegmentEncoder: Send + Sync {
    /// Fail if the encoder tool cannot be invoked at all.
    async fn check_available(&self) -> MediaResult<()>;

    /// Encoders supported by the tool.
    async fn capabilities(&self) -> MediaResult<EncoderCapabilities>;

    async fn encode(&self, job: &EncodeJob, profile: &EncodingProfile) -> MediaResult<()>;

    /// Join the files listed in a concat list-file.
    async fn concat(
        &self,
        list_file: &Path,
        output: &Path,
        mode: ConcatMode,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;

    /// Scale and pad `input` to exactly `width`x`height`.
    async fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;

    /// Render the subtitle file onto the video of `input`.
    async fn burn_subtitles(
        &self,
        input: &Path,
        subtitles: &Path,
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;
}

/// FFmpeg CLI implementation of [`SegmentEncoder`].
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
    probe_timeout_secs: u64,
}

impl FfmpegEncoder {
    /// `timeout_secs` bounds every encode/concat/resize invocation.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
            probe_timeout_secs: 30,
        }
    }

    pub fn with_probe_timeout(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs.max(1);
        self
    }

    /// Arguments of a trim job, exposed for logging and tests.
    pub fn encode_command(job: &EncodeJob, profile: &EncodingProfile) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(&job.input, &job.output)
            .seek(job.start)
            .duration(job.duration);

        let cmd = match job.mode {
            EncodeMode::Reencode => cmd
                .output_args(profile.video_args())
                .output_args(profile.audio_args())
                .faststart(),
            EncodeMode::StreamCopy => cmd.codec_copy(),
        };

        cmd.output_args(["-avoid_negative_ts", "make_zero"])
    }

    pub fn concat_command(
        list_file: &Path,
        output: &Path,
        mode: ConcatMode,
        profile: &EncodingProfile,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(list_file, output).input_args(["-f", "concat", "-safe", "0"]);
        match mode {
            ConcatMode::StreamCopy => cmd.codec_copy(),
            ConcatMode::Reencode => cmd
                .output_args(profile.video_args())
                .output_args(profile.audio_args())
                .faststart(),
        }
    }

    pub fn burn_subtitles_command(
        input: &Path,
        subtitles: &Path,
        output: &Path,
        profile: &EncodingProfile,
    ) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .video_filter(subtitles_filter(subtitles))
            .output_args(profile.video_args())
            .audio_codec("copy")
            .faststart()
    }
}

#[async_trait]
impl SegmentEncoder for FfmpegEncoder {
    async fn check_available(&self) -> MediaResult<()> {
        check_ffmpeg().map(|_| ())
    }

    async fn capabilities(&self) -> MediaResult<EncoderCapabilities> {
        probe_encoders(self.probe_timeout_secs).await
    }

    async fn encode(&self, job: &EncodeJob, profile: &EncodingProfile) -> MediaResult<()> {
        debug!(
            segment = job.index,
            start = job.start,
            duration = job.duration,
            mode = ?job.mode,
            "Encoding segment"
        );
        self.runner.run(&Self::encode_command(job, profile)).await
    }

    async fn concat(
        &self,
        list_file: &Path,
        output: &Path,
        mode: ConcatMode,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        self.runner
            .run(&Self::concat_command(list_file, output, mode, profile))
            .await
    }

    async fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output)
            .video_filter(scale_pad_filter(width, height))
            .output_args(profile.video_args())
            .audio_codec("copy")
            .faststart();
        self.runner.run(&cmd).await
    }

    async fn burn_subtitles(
        &self,
        input: &Path,
        subtitles: &Path,
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        self.runner
            .run(&Self::burn_subtitles_command(input, subtitles, output, profile))
            .await
    }
}
