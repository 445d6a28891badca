//! Per-segment cut outcomes.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of cutting a single segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CutOutcome {
    Success { path: PathBuf },
    Failure { error: String },
}

/// Result of one cut task, keyed by the segment's original index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CutResult {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(flatten)]
    pub outcome: CutOutcome,
}

impl CutResult {
    pub fn success(index: usize, start_time: f64, end_time: f64, path: PathBuf) -> Self {
        Self {
            index,
            start_time,
            end_time,
            outcome: CutOutcome::Success { path },
        }
    }

    pub fn failure(index: usize, start_time: f64, end_time: f64, error: impl Into<String>) -> Self {
        Self {
            index,
            start_time,
            end_time,
            outcome: CutOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CutOutcome::Success { .. })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            CutOutcome::Success { path } => Some(path),
            CutOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CutOutcome::Success { .. } => None,
            CutOutcome::Failure { error } => Some(error),
        }
    }

    /// One-line summary used in warnings and aggregated errors.
    pub fn describe(&self) -> String {
        match &self.outcome {
            CutOutcome::Success { path } => format!(
                "segment {} ({:.2}s-{:.2}s) -> {}",
                self.index,
                self.start_time,
                self.end_time,
                path.display()
            ),
            CutOutcome::Failure { error } => format!(
                "segment {} ({:.2}s-{:.2}s) failed: {}",
                self.index, self.start_time, self.end_time, error
            ),
        }
    }
}
