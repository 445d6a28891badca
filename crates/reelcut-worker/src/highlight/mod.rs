//! Highlight detection: window scoring and tiered selection.

pub mod detector;
pub mod scorer;
pub mod strategy;

pub use detector::{time_score, DetectorSettings, HighlightDetector};
pub use scorer::{AnalyzerScorer, WindowScorer};
pub use strategy::{
    select_highlights, ForcedTopN, GreedySelection, SelectionStrategy, StrategyPipeline,
};
