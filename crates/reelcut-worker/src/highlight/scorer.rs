//! Window scoring seam.

use async_trait::async_trait;

use reelcut_media::{AudioAnalyzer, VideoAnalyzer};

/// Audio and video interest of a time window, each in [0, 1].
///
/// Implementations never fail: an unmeasurable window scores 0.0.
#[async_trait]
pub trait WindowScorer: Send + Sync {
    async fn audio_score(&self, start: f64, end: f64) -> f64;

    async fn video_score(&self, start: f64, end: f64) -> f64;
}

/// Scorer backed by the signal analyzers.
#[derive(Clone)]
pub struct AnalyzerScorer {
    audio: AudioAnalyzer,
    video: VideoAnalyzer,
}

impl AnalyzerScorer {
    pub fn new(audio: AudioAnalyzer, video: VideoAnalyzer) -> Self {
        Self { audio, video }
    }
}

#[async_trait]
impl WindowScorer for AnalyzerScorer {
    async fn audio_score(&self, start: f64, end: f64) -> f64 {
        self.audio.calculate_audio_score(start, end)
    }

    async fn video_score(&self, start: f64, end: f64) -> f64 {
        self.video.calculate_video_score(start, end).await
    }
}
