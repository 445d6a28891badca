//! Seams to external collaborators.
//!
//! The workflow reaches media tools only through [`MediaBackend`] and the
//! optional [`SubtitleCollaborator`], so whole-pipeline behaviour can be
//! tested with fakes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use reelcut_media::{
    check_ffmpeg, check_ffprobe, extract_audio, probe_media, validate_input, AudioAnalyzer,
    FfmpegFrameSource, FfmpegRunner, MediaResult, VideoAnalyzer, ANALYSIS_SAMPLE_RATE,
};
use reelcut_models::{MediaInfo, TimeRange};

use crate::error::WorkerResult;
use crate::highlight::{AnalyzerScorer, WindowScorer};

/// Probe, audio extraction and window scoring for one input.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Fail fast when the external tools this backend shells out to are absent.
    async fn check_tools(&self) -> MediaResult<()> {
        Ok(())
    }

    /// Reject unusable inputs before probing. Returns the file size.
    async fn validate(&self, input: &Path) -> MediaResult<u64> {
        validate_input(input).await
    }

    async fn probe(&self, input: &Path) -> MediaResult<MediaInfo>;

    /// Write mono 16 kHz f32le PCM of `input` to `output`.
    async fn extract_audio(&self, input: &Path, output: &Path) -> MediaResult<PathBuf>;

    /// Build a window scorer. `audio` is `None` when the input has no audio.
    async fn scorer(
        &self,
        input: &Path,
        info: &MediaInfo,
        audio: Option<&Path>,
    ) -> MediaResult<Arc<dyn WindowScorer>>;
}

/// FFmpeg/FFprobe implementation of [`MediaBackend`].
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    runner: FfmpegRunner,
    probe_timeout_secs: u64,
    volume_epsilon: f64,
}

impl FfmpegBackend {
    pub fn new(ffmpeg_timeout_secs: u64, probe_timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(ffmpeg_timeout_secs),
            probe_timeout_secs,
            volume_epsilon: reelcut_media::analysis::audio::DEFAULT_VOLUME_EPSILON,
        }
    }

    pub fn with_volume_epsilon(mut self, epsilon: f64) -> Self {
        self.volume_epsilon = epsilon;
        self
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn check_tools(&self) -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }

    async fn probe(&self, input: &Path) -> MediaResult<MediaInfo> {
        probe_media(input, self.probe_timeout_secs).await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> MediaResult<PathBuf> {
        extract_audio(&self.runner, input, output).await
    }

    async fn scorer(
        &self,
        input: &Path,
        info: &MediaInfo,
        audio: Option<&Path>,
    ) -> MediaResult<Arc<dyn WindowScorer>> {
        let audio = match audio {
            Some(path) => AudioAnalyzer::from_pcm_file(path, ANALYSIS_SAMPLE_RATE).await?,
            None => {
                info!(input = %input.display(), "No audio stream, audio scores will be 0");
                AudioAnalyzer::silent(ANALYSIS_SAMPLE_RATE)
            }
        }
        .with_epsilon(self.volume_epsilon);

        let frames = Arc::new(FfmpegFrameSource::new(input, self.runner.clone()));
        let video = VideoAnalyzer::new(frames, info.fps).with_total_frames(info.total_frames());

        Ok(Arc::new(AnalyzerScorer::new(audio, video)))
    }
}

/// What a subtitle collaborator gets to work with.
#[derive(Debug, Clone, Copy)]
pub struct SubtitleRequest<'a> {
    /// Analysis audio of the source, shared with highlight detection
    pub audio: Option<&'a Path>,
    /// The finished reel
    pub reel: &'a Path,
    /// Source time ranges making up the reel, in reel order
    pub time_ranges: &'a [TimeRange],
}

/// Speech recognition and subtitle formatting, provided by the embedder.
#[async_trait]
pub trait SubtitleCollaborator: Send + Sync {
    /// Produce a subtitle file for the reel, or `None` when there is no speech.
    async fn generate(&self, request: SubtitleRequest<'_>) -> WorkerResult<Option<PathBuf>>;
}
