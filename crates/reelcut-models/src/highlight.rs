//! Highlight detection results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::segment::{HighlightSelection, Segment, TargetWindow};

/// A time range handed to the cutter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Outcome of highlight detection for one video.
///
/// `success` and `in_target_range` are independent: a successful result may
/// still fall outside the adjusted target window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightResult {
    pub success: bool,
    /// Selected segments in time order
    pub segments: Vec<Segment>,
    pub time_ranges: Vec<TimeRange>,
    pub total_duration: f64,
    pub segment_count: usize,
    pub average_score: f64,
    pub in_target_range: bool,
    /// Target window after adjustment for short/small inputs
    pub target: TargetWindow,
    /// Number of scored windows the selection drew from
    pub candidate_count: usize,
    /// Name of the selection strategy that produced the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HighlightResult {
    pub fn from_selection(
        selection: HighlightSelection,
        target: TargetWindow,
        candidate_count: usize,
        strategy: impl Into<String>,
    ) -> Self {
        let time_ranges = selection
            .segments
            .iter()
            .map(|s| TimeRange {
                start: s.start_time,
                end: s.end_time,
            })
            .collect();

        Self {
            success: !selection.segments.is_empty(),
            segment_count: selection.segments.len(),
            time_ranges,
            total_duration: selection.total_duration,
            average_score: selection.average_score,
            in_target_range: selection.in_target_range,
            segments: selection.segments,
            target,
            candidate_count,
            strategy: Some(strategy.into()),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>, target: TargetWindow, candidate_count: usize) -> Self {
        Self {
            success: false,
            segments: Vec::new(),
            time_ranges: Vec::new(),
            total_duration: 0.0,
            segment_count: 0,
            average_score: 0.0,
            in_target_range: false,
            target,
            candidate_count,
            strategy: None,
            error: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_range_are_independent() {
        let target = TargetWindow::new(100.0, 200.0);
        let selection =
            HighlightSelection::from_segments(vec![Segment::new(0, 0.0, 10.0, 0.5)], &target);
        let result = HighlightResult::from_selection(selection, target, 1, "forced_top_n");

        assert!(result.success);
        assert!(!result.in_target_range);
        assert_eq!(result.time_ranges, vec![TimeRange { start: 0.0, end: 10.0 }]);
    }

    #[test]
    fn test_failed_result_serializes_error() {
        let result = HighlightResult::failed("no viable segments", TargetWindow::default(), 0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no viable segments");
        assert!(json.get("strategy").is_none());
    }
}
