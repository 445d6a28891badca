//! Shared data models for the reelcut highlight pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Probed media information
//! - Scored segments, target windows and highlight selections
//! - Per-segment cut outcomes
//! - Encoding profiles and output orientation
//! - Per-video process results and batch reports

pub mod cut;
pub mod encoding;
pub mod error;
pub mod highlight;
pub mod media;
pub mod process;
pub mod segment;

// Re-export common types
pub use cut::{CutOutcome, CutResult};
pub use encoding::{EncoderPreference, EncodingProfile, Orientation};
pub use error::{ModelError, ModelResult};
pub use highlight::{HighlightResult, TimeRange};
pub use media::MediaInfo;
pub use process::{BatchItem, BatchReport, ProcessOutcome, ProcessResult, ProcessStage, StageTiming};
pub use segment::{HighlightSelection, Segment, TargetWindow};
