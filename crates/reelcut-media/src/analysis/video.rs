//! Motion and scene-change analysis.
//!
//! # Scoring
//! Motion readings are mean absolute grayscale differences between
//! consecutive sampled frames (normalized to [0, 1]). A window's score blends
//! the mean, variance and peak of those readings with how often the motion
//! level changes, so steady high motion scores below bursty motion.
//!
//! # Scene changes
//! Every 5th frame is reduced to an 8x8x8 RGB histogram and correlated with
//! the previous sample; low correlation marks a cut.
//!
//! # Key frames
//! [`VideoAnalyzer::extract_key_frames`] samples RGB frames at a fixed
//! interval, e.g. for previews of a selected segment.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use reelcut_models::media::FALLBACK_FPS;

use super::frames::{Frame, FrameRequest, FrameSource, PixelFormat};
use super::{mean_variance, unit};

/// Target number of motion samples per second.
const MOTION_SAMPLES_PER_SEC: f64 = 10.0;
/// Frame stride of scene-change sampling.
const SCENE_SAMPLE_STRIDE: u64 = 5;
/// Histogram bins per colour channel.
const HISTOGRAM_BINS: usize = 8;
/// A reading counts as a change when it moves by more than this share of the mean.
const CHANGE_FRACTION: f64 = 0.3;
/// Key frame spacing used when the requested interval is unusable (seconds).
pub const DEFAULT_KEY_FRAME_INTERVAL: f64 = 1.0;

/// Motion intensity at one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionReading {
    pub frame: u64,
    pub time: f64,
    pub intensity: f64,
}

/// An RGB frame sampled at `time` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrame {
    pub frame: u64,
    pub time: f64,
    pub image: Frame,
}

/// Video analyzer over a [`FrameSource`].
#[derive(Clone)]
pub struct VideoAnalyzer {
    source: Arc<dyn FrameSource>,
    fps: f64,
    total_frames: Option<u64>,
}

impl VideoAnalyzer {
    /// Create an analyzer. `fps <= 0` (or non-finite) is treated as 25.
    pub fn new(source: Arc<dyn FrameSource>, fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FALLBACK_FPS
        };
        Self {
            source,
            fps,
            total_frames: None,
        }
    }

    /// Clamp frame ranges to the number of frames in the video.
    pub fn with_total_frames(mut self, total_frames: u64) -> Self {
        self.total_frames = Some(total_frames);
        self
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Motion interest score of `[start, end)` in [0, 1].
    pub async fn calculate_video_score(&self, start: f64, end: f64) -> f64 {
        let interval = ((self.fps / MOTION_SAMPLES_PER_SEC).floor() as u64).max(1);
        let readings = self.motion_profile(start, end, interval).await;
        let intensities: Vec<f64> = readings.iter().map(|r| r.intensity).collect();
        motion_score(&intensities)
    }

    /// Motion readings of `[start, end)`, sampling every `sample_interval` frames.
    pub async fn motion_profile(&self, start: f64, end: f64, sample_interval: u64) -> Vec<MotionReading> {
        let Some((start_frame, end_frame)) = self.frame_range(start, end) else {
            debug!(start, end, "Degenerate frame range, skipping decode");
            return Vec::new();
        };
        let interval = sample_interval.max(1);

        let request = FrameRequest {
            start: start_frame as f64 / self.fps,
            duration: (end_frame - start_frame) as f64 / self.fps,
            sample_fps: self.fps / interval as f64,
            format: PixelFormat::Gray,
        };

        let frames = match self.source.frames(&request).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(start, end, error = %e, "Frame decode failed, scoring window as 0");
                return Vec::new();
            }
        };

        frames
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| {
                let intensity = frame_difference(&pair[0], &pair[1])?;
                let frame = start_frame + (i as u64 + 1) * interval;
                Some(MotionReading {
                    frame,
                    time: frame as f64 / self.fps,
                    intensity,
                })
            })
            .collect()
    }

    /// Scene cut timestamps (seconds) within `[start, end)`.
    ///
    /// A cut is flagged when the histogram correlation between consecutive
    /// samples drops below `1 - threshold`.
    pub async fn detect_scene_changes(&self, start: f64, end: f64, threshold: f64) -> Vec<f64> {
        let Some((start_frame, end_frame)) = self.frame_range(start, end) else {
            return Vec::new();
        };

        let request = FrameRequest {
            start: start_frame as f64 / self.fps,
            duration: (end_frame - start_frame) as f64 / self.fps,
            sample_fps: self.fps / SCENE_SAMPLE_STRIDE as f64,
            format: PixelFormat::Rgb24,
        };

        let frames = match self.source.frames(&request).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(start, end, error = %e, "Frame decode failed, no scene changes reported");
                return Vec::new();
            }
        };

        let histograms: Vec<Vec<f64>> = frames.par_iter().map(color_histogram).collect();
        let cutoff = 1.0 - threshold.clamp(0.0, 1.0);

        let cuts: Vec<f64> = histograms
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| histogram_correlation(&pair[0], &pair[1]) < cutoff)
            .map(|(i, _)| {
                let frame = start_frame + (i as u64 + 1) * SCENE_SAMPLE_STRIDE;
                frame as f64 / self.fps
            })
            .collect();

        info!(start, end, cuts = cuts.len(), "Scene change detection complete");
        cuts
    }

    /// RGB frames of `[start, end)`, one every `interval_secs` seconds.
    ///
    /// The spacing is rounded to whole frames. Decode failures yield no frames.
    pub async fn extract_key_frames(&self, start: f64, end: f64, interval_secs: f64) -> Vec<KeyFrame> {
        let Some((start_frame, end_frame)) = self.frame_range(start, end) else {
            return Vec::new();
        };
        let interval = if interval_secs.is_finite() && interval_secs > 0.0 {
            interval_secs
        } else {
            DEFAULT_KEY_FRAME_INTERVAL
        };
        let stride = ((interval * self.fps).round() as u64).max(1);

        let request = FrameRequest {
            start: start_frame as f64 / self.fps,
            duration: (end_frame - start_frame) as f64 / self.fps,
            sample_fps: self.fps / stride as f64,
            format: PixelFormat::Rgb24,
        };

        let frames = match self.source.frames(&request).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(start, end, error = %e, "Frame decode failed, no key frames extracted");
                return Vec::new();
            }
        };

        let key_frames: Vec<KeyFrame> = frames
            .into_iter()
            .enumerate()
            .map(|(i, image)| {
                let frame = start_frame + i as u64 * stride;
                KeyFrame {
                    frame,
                    time: frame as f64 / self.fps,
                    image,
                }
            })
            .take_while(|k| k.frame < end_frame)
            .collect();

        debug!(start, end, count = key_frames.len(), "Extracted key frames");
        key_frames
    }

    /// Frame range of a time window after clamping; `None` when empty.
    fn frame_range(&self, start: f64, end: f64) -> Option<(u64, u64)> {
        if !start.is_finite() || !end.is_finite() {
            return None;
        }
        let start_frame = (start.max(0.0) * self.fps).floor() as u64;
        let mut end_frame = (end.max(0.0) * self.fps).floor() as u64;
        if let Some(total) = self.total_frames {
            end_frame = end_frame.min(total);
        }
        (end_frame > start_frame).then_some((start_frame, end_frame))
    }
}

/// Composite motion score from a series of readings.
pub fn motion_score(readings: &[f64]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }

    let (avg, variance) = mean_variance(readings);
    let max = readings.iter().copied().fold(0.0, f64::max);

    let change_freq = if readings.len() > 1 {
        let changes = readings
            .windows(2)
            .filter(|pair| (pair[1] - pair[0]).abs() > CHANGE_FRACTION * avg)
            .count();
        changes as f64 / (readings.len() - 1) as f64
    } else {
        0.0
    };

    let avg_score = (avg * 5.0).min(1.0);
    let variance_score = (variance * 20.0).min(1.0);
    let max_score = (max * 3.0).min(1.0);

    unit(0.3 * avg_score + 0.3 * variance_score + 0.2 * max_score + 0.2 * change_freq)
}

/// Mean absolute grayscale difference in [0, 1]; `None` for mismatched frames.
fn frame_difference(a: &Frame, b: &Frame) -> Option<f64> {
    if a.data.len() != b.data.len() || a.data.is_empty() {
        return None;
    }
    let total: u64 = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    Some(total as f64 / a.data.len() as f64 / 255.0)
}

/// Normalized 8x8x8 RGB histogram.
fn color_histogram(frame: &Frame) -> Vec<f64> {
    let mut bins = vec![0.0; HISTOGRAM_BINS.pow(3)];
    let shift = 8 - HISTOGRAM_BINS.trailing_zeros();
    let pixels = frame.data.chunks_exact(3);
    let count = pixels.len();

    for px in pixels {
        let r = (px[0] >> shift) as usize;
        let g = (px[1] >> shift) as usize;
        let b = (px[2] >> shift) as usize;
        bins[(r * HISTOGRAM_BINS + g) * HISTOGRAM_BINS + b] += 1.0;
    }

    if count > 0 {
        for bin in &mut bins {
            *bin /= count as f64;
        }
    }
    bins
}

/// Pearson correlation of two histograms.
fn histogram_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        // Flat histograms: identical means no change
        return if a[..n] == b[..n] { 1.0 } else { 0.0 };
    }
    cov / denom
}
