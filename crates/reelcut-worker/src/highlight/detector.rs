//! Highlight detection.
//!
//! # Flow
//! 1. Partition `[0, duration)` into fixed windows (the last one truncated)
//! 2. Score every window on a bounded pool: audio, video and time position
//! 3. Shrink the target window for short or small inputs
//! 4. Run the selection tiers until one yields enough material

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use reelcut_models::{HighlightResult, HighlightSelection, MediaInfo, Segment, TargetWindow};

use super::scorer::WindowScorer;
use super::strategy::{select_highlights, StrategyPipeline};
use crate::config::{PipelineConfig, ScoringWeights};

/// Inputs shorter than this (seconds) get an adjusted target.
const SHORT_INPUT_SECS: f64 = 300.0;
/// Inputs smaller than this (MB) get an adjusted target.
const SMALL_INPUT_MB: f64 = 100.0;
/// Sources up to this length (seconds) use the lower adjustment band.
const SHORT_BAND_SECS: f64 = 200.0;
/// Floor of the adjusted minimum for sources longer than it (seconds).
const ADJUSTED_MIN_FLOOR_SECS: f64 = 60.0;

/// Detector parameters taken from the pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub weights: ScoringWeights,
    pub segment_duration: f64,
    pub min_segment_duration: f64,
    pub target: TargetWindow,
    pub analysis_workers: usize,
}

impl DetectorSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            weights: config.weights,
            segment_duration: config.segment_duration,
            min_segment_duration: config.min_segment_duration,
            target: config.target_window(),
            analysis_workers: config.analysis_workers,
        }
    }
}

pub struct HighlightDetector {
    settings: DetectorSettings,
    strategies: StrategyPipeline,
}

impl HighlightDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        let strategies = StrategyPipeline::standard(settings.min_segment_duration);
        Self {
            settings,
            strategies,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(DetectorSettings::from_config(config))
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Window bounds covering `[0, duration)` contiguously.
    pub fn partition(duration: f64, window: f64) -> Vec<(usize, f64, f64)> {
        if !(duration.is_finite() && duration > 0.0 && window.is_finite() && window > 0.0) {
            return Vec::new();
        }
        let mut bounds = Vec::new();
        let mut index = 0;
        loop {
            let start = index as f64 * window;
            if start >= duration {
                break;
            }
            let end = ((index + 1) as f64 * window).min(duration);
            bounds.push((index, start, end));
            index += 1;
        }
        bounds
    }

    /// Score every window of the video; result sorted by score, highest first.
    pub async fn analyze_video(&self, duration: f64, scorer: &dyn WindowScorer) -> Vec<Segment> {
        let bounds = Self::partition(duration, self.settings.segment_duration);
        info!(
            duration,
            windows = bounds.len(),
            window = self.settings.segment_duration,
            "Scoring windows"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.analysis_workers.max(1)));
        let futures = bounds.into_iter().map(|(index, start, end)| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.ok();
                let audio = scorer.audio_score(start, end).await;
                let video = scorer.video_score(start, end).await;
                let time = time_score(start, end, duration);
                let score = self.composite_score(audio, video, time);
                debug!(index, start, end, audio, video, time, score, "Window scored");
                Segment::new(index, start, end, score)
            }
        });

        let mut segments = join_all(futures).await;
        segments.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        segments
    }

    /// Weighted composite clamped to [0, 1].
    pub fn composite_score(&self, audio: f64, video: f64, time: f64) -> f64 {
        let w = &self.settings.weights;
        let score = audio * w.audio + video * w.video + time * w.time;
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    /// Shrink the target window for short or small inputs.
    ///
    /// Sources up to 200s aim for 50-80% of their length, longer ones for
    /// 60-90%, with the minimum floored at 60s when the source exceeds 60s.
    /// The result never exceeds the configured window.
    pub fn adjust_target_duration(&self, info: &MediaInfo) -> TargetWindow {
        let nominal = self.settings.target;
        let duration = info.duration;
        if !(duration < SHORT_INPUT_SECS || info.size_mb() < SMALL_INPUT_MB) {
            return nominal;
        }

        let (low, high) = if duration <= SHORT_BAND_SECS {
            (0.5, 0.8)
        } else {
            (0.6, 0.9)
        };
        let mut min = duration * low;
        if duration > ADJUSTED_MIN_FLOOR_SECS {
            min = min.max(ADJUSTED_MIN_FLOOR_SECS);
        }
        let min = min.min(nominal.min);
        let max = (duration * high).min(nominal.max).max(min);

        let adjusted = TargetWindow::new(min, max);
        if adjusted != nominal {
            info!(
                duration,
                size_mb = info.size_mb(),
                min = adjusted.min,
                max = adjusted.max,
                "Adjusted target duration for short input"
            );
        }
        adjusted
    }

    /// Single greedy selection with an explicit minimum duration.
    pub fn select_highlights(
        &self,
        candidates: &[Segment],
        target: &TargetWindow,
        min_segment_duration: f64,
    ) -> HighlightSelection {
        select_highlights(candidates, target, min_segment_duration)
    }

    /// Run the detection state machine over a probed video.
    pub async fn detect_highlights(&self, info: &MediaInfo, scorer: &dyn WindowScorer) -> HighlightResult {
        let target = self.adjust_target_duration(info);

        let candidates = self.analyze_video(info.duration, scorer).await;
        if candidates.is_empty() {
            warn!(duration = info.duration, "No windows to score");
            return HighlightResult::failed("video has no scorable windows", target, 0);
        }

        let Some((selection, strategy)) = self.strategies.run(&candidates, &target) else {
            warn!(candidates = candidates.len(), "No viable highlight segments");
            return HighlightResult::failed("no viable highlight segments", target, candidates.len());
        };

        info!(
            strategy,
            segments = selection.len(),
            total = selection.total_duration,
            in_range = selection.in_target_range,
            "Highlights selected"
        );
        HighlightResult::from_selection(selection, target, candidates.len(), strategy)
    }
}

/// Temporal position term: 1 at the middle of the video, 0 at either end.
pub fn time_score(start: f64, end: f64, total_duration: f64) -> f64 {
    let position = if total_duration > 0.0 {
        ((start + end) / 2.0) / total_duration
    } else {
        0.5
    };
    (1.0 - (position - 0.5).abs() * 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ConstScorer(f64);

    #[async_trait]
    impl WindowScorer for ConstScorer {
        async fn audio_score(&self, _start: f64, _end: f64) -> f64 {
            self.0
        }

        async fn video_score(&self, _start: f64, _end: f64) -> f64 {
            self.0
        }
    }

    fn media(duration: f64, size_mb: u64) -> MediaInfo {
        MediaInfo {
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            video_codec: "h264".to_string(),
            audio_codec: Some("aac".to_string()),
            bitrate: 4_000_000,
            size: size_mb * 1024 * 1024,
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        }
    }

    fn detector() -> HighlightDetector {
        HighlightDetector::from_config(&PipelineConfig::default())
    }

    #[test]
    fn test_partition_truncates_last_window() {
        let bounds = HighlightDetector::partition(25.0, 10.0);
        assert_eq!(bounds, vec![(0, 0.0, 10.0), (1, 10.0, 20.0), (2, 20.0, 25.0)]);
        assert!(HighlightDetector::partition(0.0, 10.0).is_empty());
        assert!(HighlightDetector::partition(10.0, 0.0).is_empty());
    }

    #[test]
    fn test_time_score() {
        assert_eq!(time_score(45.0, 55.0, 100.0), 1.0);
        assert_eq!(time_score(0.0, 0.0, 100.0), 0.0);
        assert!((time_score(0.0, 10.0, 100.0) - 0.1).abs() < 1e-9);
        assert_eq!(time_score(0.0, 10.0, 0.0), 1.0);
    }

    #[test]
    fn test_composite_clamped() {
        let detector = HighlightDetector::new(DetectorSettings {
            weights: ScoringWeights { audio: 1.0, video: 1.0, time: 1.0 },
            ..DetectorSettings::from_config(&PipelineConfig::default())
        });
        assert_eq!(detector.composite_score(1.0, 1.0, 1.0), 1.0);
        assert_eq!(detector.composite_score(f64::NAN, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_adjust_target_short_input() {
        let target = detector().adjust_target_duration(&media(40.0, 5));
        assert!((target.min - 20.0).abs() < 1e-9);
        assert!((target.max - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjust_target_floor_and_bands() {
        let d = detector();
        // 250s source: 60-90% band
        let t = d.adjust_target_duration(&media(250.0, 500));
        assert_eq!((t.min, t.max), (150.0, 225.0));

        // 100s source: 50s floored to 60s, max 80s
        let t = d.adjust_target_duration(&media(100.0, 500));
        assert_eq!((t.min, t.max), (60.0, 80.0));

        // 70s source: floor exceeds the band's max, max follows min
        let t = d.adjust_target_duration(&media(70.0, 500));
        assert_eq!((t.min, t.max), (60.0, 60.0));

        // Long and large: untouched
        assert_eq!(d.adjust_target_duration(&media(600.0, 500)), TargetWindow::default());

        // Long but small: capped at the nominal window
        assert_eq!(d.adjust_target_duration(&media(600.0, 50)), TargetWindow::default());
    }

    #[tokio::test]
    async fn test_analyze_video_sorted_by_score() {
        let segments = detector().analyze_video(100.0, &ConstScorer(0.5)).await;
        assert_eq!(segments.len(), 10);
        // Equal audio/video scores: the time term ranks central windows first
        assert!(segments[0].index == 4 || segments[0].index == 5);
        assert!(segments.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(segments.iter().all(|s| (0.0..=1.0).contains(&s.score)));
    }

    #[tokio::test]
    async fn test_detect_highlights_zero_duration_fails() {
        let info = media(0.0, 5);
        let result = detector().detect_highlights(&info, &ConstScorer(0.5)).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
