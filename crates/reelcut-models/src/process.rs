//! Per-video process results and batch reports.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::highlight::HighlightResult;

/// Pipeline stages of a single video, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStage {
    Validate,
    Probe,
    ExtractAudio,
    Detect,
    Cut,
    Resize,
    Subtitle,
}

impl ProcessStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Probe => "probe",
            Self::ExtractAudio => "extract_audio",
            Self::Detect => "detect",
            Self::Cut => "cut",
            Self::Resize => "resize",
            Self::Subtitle => "subtitle",
        }
    }
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageTiming {
    pub stage: ProcessStage,
    pub seconds: f64,
}

/// Success or failure branch of a processed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Success {
        output_path: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtitle_path: Option<PathBuf>,
        highlights: HighlightResult,
        /// Non-fatal problems, such as segments dropped from the reel
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Failure {
        stage: ProcessStage,
        diagnostic: String,
    },
}

/// Result of processing one input video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessResult {
    pub run_id: String,
    pub input_path: PathBuf,
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ProcessOutcome,
    pub timings: Vec<StageTiming>,
    pub total_seconds: f64,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProcessOutcome::Success { .. })
    }

    /// Final reel path; always `None` for failures.
    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            ProcessOutcome::Success { output_path, .. } => Some(output_path),
            ProcessOutcome::Failure { .. } => None,
        }
    }

    pub fn failed_stage(&self) -> Option<ProcessStage> {
        match &self.outcome {
            ProcessOutcome::Success { .. } => None,
            ProcessOutcome::Failure { stage, .. } => Some(*stage),
        }
    }

    pub fn warnings(&self) -> &[String] {
        match &self.outcome {
            ProcessOutcome::Success { warnings, .. } => warnings,
            ProcessOutcome::Failure { .. } => &[],
        }
    }

    pub fn highlights(&self) -> Option<&HighlightResult> {
        match &self.outcome {
            ProcessOutcome::Success { highlights, .. } => Some(highlights),
            ProcessOutcome::Failure { .. } => None,
        }
    }

    pub fn timing(&self, stage: ProcessStage) -> Option<f64> {
        self.timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.seconds)
    }
}

/// One entry of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchItem {
    Processed(ProcessResult),
    /// Not dispatched because the batch was cancelled first
    Skipped { input_path: PathBuf },
}

impl BatchItem {
    pub fn input_path(&self) -> &Path {
        match self {
            Self::Processed(result) => &result.input_path,
            Self::Skipped { input_path } => input_path,
        }
    }

    pub fn result(&self) -> Option<&ProcessResult> {
        match self {
            Self::Processed(result) => Some(result),
            Self::Skipped { .. } => None,
        }
    }
}

/// Aggregated batch outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn new(items: Vec<BatchItem>, cancelled: bool) -> Self {
        let succeeded = items
            .iter()
            .filter(|i| i.result().is_some_and(ProcessResult::is_success))
            .count();
        let skipped = items
            .iter()
            .filter(|i| matches!(i, BatchItem::Skipped { .. }))
            .count();
        let failed = items.len() - succeeded - skipped;
        Self {
            items,
            succeeded,
            failed,
            skipped,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(stage: ProcessStage) -> ProcessResult {
        ProcessResult {
            run_id: "run".to_string(),
            input_path: PathBuf::from("in.mp4"),
            started_at: Utc::now(),
            outcome: ProcessOutcome::Failure {
                stage,
                diagnostic: "all 3 segments failed".to_string(),
            },
            timings: vec![StageTiming {
                stage: ProcessStage::Probe,
                seconds: 0.25,
            }],
            total_seconds: 1.0,
        }
    }

    #[test]
    fn test_failure_has_no_output_path() {
        let result = failure(ProcessStage::Cut);
        assert!(!result.is_success());
        assert!(result.output_path().is_none());
        assert_eq!(result.failed_stage(), Some(ProcessStage::Cut));
        assert_eq!(result.timing(ProcessStage::Probe), Some(0.25));
        assert!(result.timing(ProcessStage::Cut).is_none());
    }

    #[test]
    fn test_failure_serializes_stage_name() {
        let json = serde_json::to_value(failure(ProcessStage::ExtractAudio)).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["stage"], "extract_audio");
    }

    #[test]
    fn test_batch_report_counts() {
        let report = BatchReport::new(
            vec![
                BatchItem::Processed(failure(ProcessStage::Cut)),
                BatchItem::Skipped {
                    input_path: PathBuf::from("b.mp4"),
                },
            ],
            true,
        );
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.cancelled);
    }
}
