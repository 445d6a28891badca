//! Scored time windows and highlight selections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Shortest segment the cutter will dispatch (seconds).
pub const MIN_CUT_DURATION: f64 = 0.1;

/// A fixed-length time window scored as a unit of interest.
///
/// `index` is the window's position in the original partition and is kept
/// through score-ordered selection so the final reel can be put back in time
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub score: f64,
}

impl Segment {
    /// Create a segment. The score is clamped to [0, 1].
    pub fn new(index: usize, start_time: f64, end_time: f64, score: f64) -> Self {
        Self {
            index,
            start_time,
            end_time,
            duration: (end_time - start_time).max(0.0),
            score: clamp_unit(score),
        }
    }

    /// Check that the segment can be cut.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(ModelError::invalid_segment(self.index, "non-finite bounds"));
        }
        if self.start_time < 0.0 {
            return Err(ModelError::invalid_segment(self.index, "negative start time"));
        }
        if self.end_time - self.start_time < MIN_CUT_DURATION {
            return Err(ModelError::invalid_segment(
                self.index,
                format!(
                    "duration {:.3}s shorter than {:.1}s",
                    self.end_time - self.start_time,
                    MIN_CUT_DURATION
                ),
            ));
        }
        Ok(())
    }

    /// Gap in seconds between the end of `self` and the start of `next`.
    pub fn gap_to(&self, next: &Segment) -> f64 {
        next.start_time - self.end_time
    }

    /// Merge a run of segments into one spanning all of them.
    ///
    /// The score is the mean over every part, so each part weighs the same
    /// however long the run is. Returns `None` for an empty run.
    pub fn merge_all(parts: &[Segment]) -> Option<Segment> {
        let first = parts.first()?;
        let (mut start_time, mut end_time, mut index) = (first.start_time, first.end_time, first.index);
        let mut score_sum = 0.0;
        for part in parts {
            start_time = start_time.min(part.start_time);
            end_time = end_time.max(part.end_time);
            index = index.min(part.index);
            score_sum += part.score;
        }
        Some(Segment {
            index,
            start_time,
            end_time,
            duration: end_time - start_time,
            score: clamp_unit(score_sum / parts.len() as f64),
        })
    }
}

/// The [min, max] total output length highlight selection aims for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetWindow {
    pub min: f64,
    pub max: f64,
}

impl TargetWindow {
    /// Create a window, swapping the bounds if they are reversed.
    pub fn new(min: f64, max: f64) -> Self {
        let min = if min.is_finite() { min.max(0.0) } else { 0.0 };
        let max = if max.is_finite() { max.max(0.0) } else { min };
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Midpoint of the window, used as the selection target.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, duration: f64) -> bool {
        duration >= self.min && duration <= self.max
    }
}

impl Default for TargetWindow {
    fn default() -> Self {
        Self::new(180.0, 300.0)
    }
}

/// Selected segments in time order plus summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightSelection {
    pub segments: Vec<Segment>,
    pub total_duration: f64,
    pub average_score: f64,
    pub in_target_range: bool,
}

impl HighlightSelection {
    /// Build a selection; segments are re-sorted by start time.
    pub fn from_segments(mut segments: Vec<Segment>, target: &TargetWindow) -> Self {
        segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let total_duration: f64 = segments.iter().map(|s| s.duration).sum();
        let average_score = if segments.is_empty() {
            0.0
        } else {
            segments.iter().map(|s| s.score).sum::<f64>() / segments.len() as f64
        };
        Self {
            in_target_range: !segments.is_empty() && target.contains(total_duration),
            segments,
            total_duration,
            average_score,
        }
    }

    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            total_duration: 0.0,
            average_score: 0.0,
            in_target_range: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
