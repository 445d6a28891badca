//! Loudness, volume-change and silence analysis over mono PCM.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{mean_variance, unit};
use crate::audio::load_pcm_samples;
use crate::error::MediaResult;

/// Default floor for the relative volume-change denominator.
pub const DEFAULT_VOLUME_EPSILON: f64 = 1e-3;
/// Granularity of silence detection (seconds).
const SILENCE_STEP_SECS: f64 = 0.1;
/// Window used for the energy readings of the audio score (seconds).
const SCORE_ENERGY_WINDOW_SECS: f64 = 0.5;
/// Window and threshold used when counting volume changes for the score.
const SCORE_CHANGE_WINDOW_SECS: f64 = 1.0;
const SCORE_CHANGE_THRESHOLD: f64 = 0.2;
/// dBFS reported for digital silence.
const MIN_DBFS: f64 = -120.0;

/// A point where loudness changed relative to the previous window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeChange {
    /// Start of the window where the change was observed (seconds)
    pub time: f64,
    pub prev_rms: f64,
    pub curr_rms: f64,
    pub change_ratio: f64,
}

/// A qualifying silent run, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SilenceRange {
    pub start: f64,
    pub end: f64,
}

impl SilenceRange {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// RMS energy of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyReading {
    pub time: f64,
    pub energy: f64,
    pub dbfs: f64,
}

/// Whole-track audio summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioFeatures {
    pub duration: f64,
    pub avg_energy: f64,
    pub max_energy: f64,
    pub energy_variance: f64,
    pub volume_changes: usize,
    pub silence_count: usize,
    pub silence_duration: f64,
    pub silence_ratio: f64,
}

/// Audio analyzer over decoded mono PCM normalized to [-1, 1].
///
/// Samples are shared behind an `Arc`, so cloning the analyzer for
/// concurrent window scoring is cheap.
#[derive(Debug, Clone)]
pub struct AudioAnalyzer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    epsilon: f64,
}

impl AudioAnalyzer {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
            epsilon: DEFAULT_VOLUME_EPSILON,
        }
    }

    /// Analyzer with no audio; every score is 0.0.
    pub fn silent(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    /// Load raw f32le PCM written by the audio extraction stage.
    pub async fn from_pcm_file(path: &Path, sample_rate: u32) -> MediaResult<Self> {
        let samples = load_pcm_samples(path).await?;
        debug!(
            path = %path.display(),
            samples = samples.len(),
            "Loaded analysis audio"
        );
        Ok(Self::new(samples, sample_rate))
    }

    /// Set the floor used as the denominator of relative volume changes.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = if epsilon.is_finite() && epsilon > 0.0 {
            epsilon
        } else {
            DEFAULT_VOLUME_EPSILON
        };
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Track duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Relative volume change points over the whole track.
    pub fn detect_volume_changes(&self, window_secs: f64, threshold: f64) -> Vec<VolumeChange> {
        volume_changes(
            &self.samples,
            self.sample_rate,
            0.0,
            window_secs,
            threshold,
            self.epsilon,
        )
    }

    /// Silent runs at least `min_len_secs` long, quieter than `thresh_dbfs`.
    pub fn detect_silence(&self, min_len_secs: f64, thresh_dbfs: f64) -> Vec<SilenceRange> {
        let step = ((SILENCE_STEP_SECS * self.sample_rate as f64).round() as usize).max(1);
        let threshold = dbfs_to_linear(thresh_dbfs);
        let rate = self.sample_rate as f64;

        let mut ranges = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut offset = 0;

        for chunk in self.samples.chunks(step) {
            let silent = rms(chunk) < threshold;
            match (silent, run_start) {
                (true, None) => run_start = Some(offset),
                (false, Some(start)) => {
                    push_if_long_enough(&mut ranges, start, offset, rate, min_len_secs);
                    run_start = None;
                }
                _ => {}
            }
            offset += chunk.len();
        }

        if let Some(start) = run_start {
            push_if_long_enough(&mut ranges, start, offset, rate, min_len_secs);
        }

        ranges
    }

    /// RMS energy per window over the whole track.
    pub fn analyze_energy(&self, window_secs: f64) -> Vec<EnergyReading> {
        let Some(window) = window_len(window_secs, self.sample_rate) else {
            return Vec::new();
        };
        windowed_rms(&self.samples, window)
            .into_iter()
            .map(|(offset, energy)| EnergyReading {
                time: offset as f64 / self.sample_rate as f64,
                energy,
                dbfs: linear_to_dbfs(energy),
            })
            .collect()
    }

    /// Interest score of `[start, end)` in [0, 1].
    ///
    /// Rewards energetic and dynamic audio over flat loud audio. Windows that
    /// cannot be measured score 0.0.
    pub fn calculate_audio_score(&self, start: f64, end: f64) -> f64 {
        let Some(window) = self.slice(start, end) else {
            debug!(start, end, "Audio window out of range, scoring 0");
            return 0.0;
        };

        if window.iter().any(|s| !s.is_finite()) {
            warn!(start, end, "Non-finite audio samples in window, scoring 0");
            return 0.0;
        }

        let Some(energy_window) = window_len(SCORE_ENERGY_WINDOW_SECS, self.sample_rate) else {
            return 0.0;
        };
        let energies: Vec<f64> = windowed_rms(window, energy_window)
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        if energies.is_empty() {
            return 0.0;
        }

        let (avg, variance) = mean_variance(&energies);
        let changes = volume_changes(
            window,
            self.sample_rate,
            start,
            SCORE_CHANGE_WINDOW_SECS,
            SCORE_CHANGE_THRESHOLD,
            self.epsilon,
        )
        .len();
        let change_score = (changes as f64 / 10.0).min(1.0);

        unit(avg * 0.3 + variance * 2.0 * 0.3 + change_score * 0.4)
    }

    /// Whole-track summary: energy statistics, change count and silence.
    pub fn features(&self) -> AudioFeatures {
        let energies: Vec<f64> = self
            .analyze_energy(SCORE_ENERGY_WINDOW_SECS)
            .iter()
            .map(|r| r.energy)
            .collect();
        let (avg_energy, energy_variance) = mean_variance(&energies);
        let max_energy = energies.iter().copied().fold(0.0, f64::max);
        let silences = self.detect_silence(1.0, -40.0);
        let silence_duration: f64 = silences.iter().map(SilenceRange::duration).sum();
        let duration = self.duration();

        AudioFeatures {
            duration,
            avg_energy,
            max_energy,
            energy_variance,
            volume_changes: self.detect_volume_changes(1.0, 0.3).len(),
            silence_count: silences.len(),
            silence_duration,
            silence_ratio: if duration > 0.0 {
                silence_duration / duration
            } else {
                0.0
            },
        }
    }

    fn slice(&self, start: f64, end: f64) -> Option<&[f32]> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return None;
        }
        let rate = self.sample_rate as f64;
        let from = (start.max(0.0) * rate).floor() as usize;
        let to = ((end * rate).ceil() as usize).min(self.samples.len());
        (from < to).then(|| &self.samples[from..to])
    }
}

fn push_if_long_enough(
    ranges: &mut Vec<SilenceRange>,
    start: usize,
    end: usize,
    rate: f64,
    min_len_secs: f64,
) {
    let range = SilenceRange {
        start: start as f64 / rate,
        end: end as f64 / rate,
    };
    if range.duration() + 1e-9 >= min_len_secs {
        ranges.push(range);
    }
}

fn window_len(window_secs: f64, sample_rate: u32) -> Option<usize> {
    if !window_secs.is_finite() || window_secs <= 0.0 {
        return None;
    }
    let len = (window_secs * sample_rate as f64).round() as usize;
    (len > 0).then_some(len)
}

/// RMS per window as `(sample offset, rms)`. A trailing window shorter than
/// half the window length is dropped.
fn windowed_rms(samples: &[f32], window: usize) -> Vec<(usize, f64)> {
    samples
        .chunks(window)
        .enumerate()
        .take_while(|(_, chunk)| chunk.len() * 2 >= window)
        .map(|(i, chunk)| (i * window, rms(chunk)))
        .collect()
}

fn volume_changes(
    samples: &[f32],
    sample_rate: u32,
    time_offset: f64,
    window_secs: f64,
    threshold: f64,
    epsilon: f64,
) -> Vec<VolumeChange> {
    let Some(window) = window_len(window_secs, sample_rate) else {
        return Vec::new();
    };

    windowed_rms(samples, window)
        .windows(2)
        .filter_map(|pair| {
            let (_, prev_rms) = pair[0];
            let (offset, curr_rms) = pair[1];
            let change_ratio = (curr_rms - prev_rms).abs() / prev_rms.max(epsilon);
            (change_ratio > threshold).then(|| VolumeChange {
                time: time_offset + offset as f64 / sample_rate as f64,
                prev_rms,
                curr_rms,
                change_ratio,
            })
        })
        .collect()
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

fn dbfs_to_linear(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0)
}

fn linear_to_dbfs(rms: f64) -> f64 {
    if rms > 0.0 {
        (20.0 * rms.log10()).max(MIN_DBFS)
    } else {
        MIN_DBFS
    }
}
