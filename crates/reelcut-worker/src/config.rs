//! Pipeline configuration.
//!
//! A single typed value built once (defaults, then file or environment, then
//! CLI overrides), sanitized at the boundary and shared read-only behind an
//! `Arc` by every stage.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use reelcut_media::{CutSettings, EncoderSettings};
use reelcut_models::encoding::{DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC, DEFAULT_CRF, DEFAULT_PRESET};
use reelcut_models::{EncoderPreference, Orientation, TargetWindow};

use crate::error::{WorkerError, WorkerResult};

const MAX_WORKERS: usize = 32;
const MIN_SEGMENT_SECS: f64 = 1.0;
const MAX_SEGMENT_SECS: f64 = 600.0;

/// Weights of the composite window score.
///
/// Not required to sum to 1; the composite is clamped instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub audio: f64,
    pub video: f64,
    pub time: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            audio: 0.4,
            video: 0.4,
            time: 0.2,
        }
    }
}

impl ScoringWeights {
    fn sanitized(self) -> Self {
        Self {
            audio: clamp_unit(self.audio),
            video: clamp_unit(self.video),
            time: clamp_unit(self.time),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weights: ScoringWeights,
    /// Target reel length bounds (seconds)
    pub target_min_duration: f64,
    pub target_max_duration: f64,
    /// Length of each scored window (seconds)
    pub segment_duration: f64,
    /// Shortest window the first selection pass accepts (seconds)
    pub min_segment_duration: f64,
    /// Videos processed concurrently
    pub batch_workers: usize,
    /// Encoder processes per video
    pub cut_workers: usize,
    /// Windows scored concurrently per video
    pub analysis_workers: usize,
    pub encoder: EncoderPreference,
    /// CRF-style quality (0-51)
    pub quality: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Timeout of every encoder invocation (seconds)
    pub ffmpeg_timeout_secs: u64,
    /// Timeout of ffprobe and capability probes (seconds)
    pub probe_timeout_secs: u64,
    pub output_dir: PathBuf,
    /// Parent of per-video scratch directories (system temp when unset)
    pub work_dir: Option<PathBuf>,
    pub orientation: Orientation,
    pub subtitles_enabled: bool,
    /// Render generated subtitles onto the reel's frames
    pub burn_subtitles: bool,
    /// Retry a failed segment re-encode with stream copy
    pub stream_copy_fallback: bool,
    /// Denominator floor of relative volume changes
    pub volume_epsilon: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            target_min_duration: 180.0,
            target_max_duration: 300.0,
            segment_duration: 10.0,
            min_segment_duration: 5.0,
            batch_workers: 4,
            cut_workers: 4,
            analysis_workers: 4,
            encoder: EncoderPreference::Software,
            quality: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            ffmpeg_timeout_secs: 300,
            probe_timeout_secs: 30,
            output_dir: PathBuf::from("output"),
            work_dir: None,
            orientation: Orientation::Original,
            subtitles_enabled: false,
            burn_subtitles: true,
            stream_copy_fallback: false,
            volume_epsilon: 1e-3,
        }
    }
}

impl PipelineConfig {
    /// Create config from `REELCUT_*` environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            weights: ScoringWeights {
                audio: env_or("REELCUT_AUDIO_WEIGHT", d.weights.audio),
                video: env_or("REELCUT_VIDEO_WEIGHT", d.weights.video),
                time: env_or("REELCUT_TIME_WEIGHT", d.weights.time),
            },
            target_min_duration: env_or("REELCUT_TARGET_MIN", d.target_min_duration),
            target_max_duration: env_or("REELCUT_TARGET_MAX", d.target_max_duration),
            segment_duration: env_or("REELCUT_SEGMENT_DURATION", d.segment_duration),
            min_segment_duration: env_or("REELCUT_MIN_SEGMENT_DURATION", d.min_segment_duration),
            batch_workers: env_or("REELCUT_BATCH_WORKERS", d.batch_workers),
            cut_workers: env_or("REELCUT_CUT_WORKERS", d.cut_workers),
            analysis_workers: env_or("REELCUT_ANALYSIS_WORKERS", d.analysis_workers),
            encoder: env_or("REELCUT_ENCODER", d.encoder),
            quality: env_or("REELCUT_QUALITY", d.quality),
            preset: std::env::var("REELCUT_PRESET").unwrap_or(d.preset),
            audio_codec: std::env::var("REELCUT_AUDIO_CODEC").unwrap_or(d.audio_codec),
            audio_bitrate: std::env::var("REELCUT_AUDIO_BITRATE").unwrap_or(d.audio_bitrate),
            ffmpeg_timeout_secs: env_or("REELCUT_FFMPEG_TIMEOUT", d.ffmpeg_timeout_secs),
            probe_timeout_secs: env_or("REELCUT_PROBE_TIMEOUT", d.probe_timeout_secs),
            output_dir: std::env::var("REELCUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.output_dir),
            work_dir: std::env::var("REELCUT_WORK_DIR").ok().map(PathBuf::from),
            orientation: env_or("REELCUT_ORIENTATION", d.orientation),
            subtitles_enabled: env_or("REELCUT_SUBTITLES", d.subtitles_enabled),
            burn_subtitles: env_or("REELCUT_BURN_SUBTITLES", d.burn_subtitles),
            stream_copy_fallback: env_or("REELCUT_STREAM_COPY_FALLBACK", d.stream_copy_fallback),
            volume_epsilon: env_or("REELCUT_VOLUME_EPSILON", d.volume_epsilon),
        }
        .sanitized()
    }

    /// Load a JSON config file. Missing fields keep their default.
    pub fn from_file(path: &Path) -> WorkerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WorkerError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            WorkerError::config_error(format!("invalid config {}: {}", path.display(), e))
        })?;
        Ok(config.sanitized())
    }

    /// Clamp every field into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.weights = self.weights.sanitized();

        let target = TargetWindow::new(self.target_min_duration, self.target_max_duration);
        if target.min != self.target_min_duration || target.max != self.target_max_duration {
            warn!(
                min = self.target_min_duration,
                max = self.target_max_duration,
                "Target duration bounds adjusted"
            );
        }
        self.target_min_duration = target.min;
        self.target_max_duration = target.max;

        self.segment_duration = clamp_finite(self.segment_duration, MIN_SEGMENT_SECS, MAX_SEGMENT_SECS, 10.0);
        self.min_segment_duration = clamp_finite(self.min_segment_duration, 0.0, self.segment_duration, 5.0);

        self.batch_workers = self.batch_workers.clamp(1, MAX_WORKERS);
        self.cut_workers = self.cut_workers.clamp(1, MAX_WORKERS);
        self.analysis_workers = self.analysis_workers.clamp(1, MAX_WORKERS);

        self.quality = self.quality.min(51);
        self.ffmpeg_timeout_secs = self.ffmpeg_timeout_secs.max(1);
        self.probe_timeout_secs = self.probe_timeout_secs.max(1);

        if !(self.volume_epsilon.is_finite() && self.volume_epsilon > 0.0) {
            self.volume_epsilon = 1e-3;
        }
        self
    }

    pub fn target_window(&self) -> TargetWindow {
        TargetWindow::new(self.target_min_duration, self.target_max_duration)
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            preference: self.encoder,
            quality: self.quality,
            preset: self.preset.clone(),
            audio_codec: self.audio_codec.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
        }
    }

    pub fn cut_settings(&self) -> CutSettings {
        CutSettings {
            workers: self.cut_workers,
            segment_timeout: Duration::from_secs(self.ffmpeg_timeout_secs),
            stream_copy_fallback: self.stream_copy_fallback,
            scratch_root: self.work_dir.clone(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn clamp_unit(value: f64) -> f64 {
    clamp_finite(value, 0.0, 1.0, 0.0)
}

fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.weights, ScoringWeights { audio: 0.4, video: 0.4, time: 0.2 });
        assert_eq!(config.target_window(), TargetWindow::new(180.0, 300.0));
        assert_eq!(config.segment_duration, 10.0);
        assert_eq!(config.cut_workers, 4);
        assert!(!config.subtitles_enabled);
        assert!(config.burn_subtitles);
        assert_eq!(config.encoder_settings().quality, 23);
        assert_eq!(config.cut_settings().segment_timeout, Duration::from_secs(300));
        assert_eq!(config, config.clone().sanitized());
    }

    #[test]
    fn test_sanitized_clamps_everything() {
        let config = PipelineConfig {
            weights: ScoringWeights { audio: 3.0, video: -1.0, time: f64::NAN },
            target_min_duration: 300.0,
            target_max_duration: 120.0,
            segment_duration: 0.0,
            min_segment_duration: 50.0,
            batch_workers: 0,
            cut_workers: 1000,
            quality: 99,
            ffmpeg_timeout_secs: 0,
            volume_epsilon: -1.0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(config.weights, ScoringWeights { audio: 1.0, video: 0.0, time: 0.0 });
        assert_eq!(config.target_min_duration, 120.0);
        assert_eq!(config.target_max_duration, 300.0);
        assert_eq!(config.segment_duration, 1.0);
        assert_eq!(config.min_segment_duration, 1.0);
        assert_eq!(config.batch_workers, 1);
        assert_eq!(config.cut_workers, MAX_WORKERS);
        assert_eq!(config.quality, 51);
        assert_eq!(config.ffmpeg_timeout_secs, 1);
        assert_eq!(config.volume_epsilon, 1e-3);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_min_duration": 30, "encoder": "nvenc", "orientation": "portrait", "burn_subtitles": false}}"#
        )
        .unwrap();

        let config = assert_ok!(PipelineConfig::from_file(file.path()));
        assert_eq!(config.target_min_duration, 30.0);
        assert_eq!(config.target_max_duration, 300.0);
        assert_eq!(config.encoder, EncoderPreference::Nvenc);
        assert_eq!(config.orientation, Orientation::Portrait);
        assert!(!config.burn_subtitles);
    }

    #[test]
    fn test_from_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_file(file.path()),
            Err(WorkerError::ConfigError(_))
        ));
        assert_err!(PipelineConfig::from_file(Path::new("/nonexistent/reelcut.json")));
    }
}
