//! Highlight reel pipeline.
//!
//! This crate provides:
//! - Typed pipeline configuration
//! - Highlight detection with tiered selection strategies
//! - The per-video workflow and bounded, cancellable batch processing
//! - Collaborator seams for media tooling and subtitles
//! - Input discovery for batch runs

pub mod collaborators;
pub mod config;
pub mod error;
pub mod highlight;
pub mod inputs;
pub mod logging;
pub mod workflow;

pub use collaborators::{FfmpegBackend, MediaBackend, SubtitleCollaborator, SubtitleRequest};
pub use config::{PipelineConfig, ScoringWeights};
pub use error::{WorkerError, WorkerResult};
pub use highlight::{AnalyzerScorer, DetectorSettings, HighlightDetector, WindowScorer};
pub use inputs::discover_inputs;
pub use logging::VideoLogger;
pub use workflow::Workflow;
