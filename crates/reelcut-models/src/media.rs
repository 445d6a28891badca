//! Probed media information.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Frame rate assumed when a container reports none (or nonsense).
pub const FALLBACK_FPS: f64 = 25.0;

/// Information about an input video, computed once by the probe stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec name
    pub video_codec: String,
    /// Audio codec name, if the file has an audio stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Bitrate in bits/second
    pub bitrate: u64,
    /// File size in bytes
    pub size: u64,
    /// Container format name as reported by ffprobe
    #[serde(default)]
    pub format_name: String,
}

impl MediaInfo {
    /// Whether the input carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// Frame rate to use for frame arithmetic.
    pub fn effective_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Total number of frames implied by duration and frame rate.
    pub fn total_frames(&self) -> u64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            (self.duration * self.effective_fps()).floor() as u64
        } else {
            0
        }
    }

    /// File size in megabytes.
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(duration: f64, fps: f64) -> MediaInfo {
        MediaInfo {
            duration,
            width: 1280,
            height: 720,
            fps,
            video_codec: "h264".to_string(),
            audio_codec: Some("aac".to_string()),
            bitrate: 2_000_000,
            size: 50 * 1024 * 1024,
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        }
    }

    #[test]
    fn test_effective_fps_falls_back() {
        assert_eq!(info(10.0, 0.0).effective_fps(), FALLBACK_FPS);
        assert_eq!(info(10.0, -3.0).effective_fps(), FALLBACK_FPS);
        assert_eq!(info(10.0, f64::NAN).effective_fps(), FALLBACK_FPS);
        assert_eq!(info(10.0, 30.0).effective_fps(), 30.0);
    }

    #[test]
    fn test_total_frames() {
        assert_eq!(info(10.0, 30.0).total_frames(), 300);
        assert_eq!(info(0.0, 30.0).total_frames(), 0);
    }

    #[test]
    fn test_size_mb() {
        assert!((info(10.0, 30.0).size_mb() - 50.0).abs() < 1e-9);
    }
}
