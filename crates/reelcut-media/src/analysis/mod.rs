//! Audio and video signal analyzers.
//!
//! Analyzers never fail on a malformed window: a window that cannot be
//! decoded or measured scores 0.0 and is logged, so one bad window cannot
//! abort highlight detection.

pub mod audio;
pub mod frames;
pub mod video;

pub use audio::{AudioAnalyzer, AudioFeatures, EnergyReading, SilenceRange, VolumeChange};
pub use frames::{FfmpegFrameSource, Frame, FrameRequest, FrameSource, PixelFormat};
pub use video::{KeyFrame, MotionReading, VideoAnalyzer};

/// Clamp a score into [0, 1], mapping NaN to 0.
pub(crate) fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Mean and population variance of a slice. Empty input yields zeros.
pub(crate) fn mean_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}
