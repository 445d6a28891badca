//! Structured per-video logging.
//!
//! Every event carries the batch `run_id` and the input path, so a single
//! video can be followed through interleaved batch output.

use std::path::Path;

use tracing::{error, info, warn, Span};
use uuid::Uuid;

use reelcut_models::ProcessStage;

/// Logger bound to one video of one run.
#[derive(Debug, Clone)]
pub struct VideoLogger {
    run_id: String,
    input: String,
}

impl VideoLogger {
    pub fn new(run_id: &str, input: &Path) -> Self {
        Self {
            run_id: run_id.to_string(),
            input: input.display().to_string(),
        }
    }

    /// Fresh run identifier.
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn log_start(&self) {
        info!(run_id = %self.run_id, input = %self.input, "Video processing started");
    }

    pub fn log_stage(&self, stage: ProcessStage, seconds: f64) {
        info!(
            run_id = %self.run_id,
            input = %self.input,
            stage = %stage,
            seconds,
            "Stage complete"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, input = %self.input, "{}", message);
    }

    pub fn log_failure(&self, stage: ProcessStage, diagnostic: &str) {
        error!(
            run_id = %self.run_id,
            input = %self.input,
            stage = %stage,
            diagnostic,
            "Video processing failed"
        );
    }

    pub fn log_completion(&self, output: &Path, seconds: f64) {
        info!(
            run_id = %self.run_id,
            input = %self.input,
            output = %output.display(),
            seconds,
            "Video processing complete"
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Span wrapping all work on this video.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("video", run_id = %self.run_id, input = %self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_logger_fields() {
        let run_id = VideoLogger::new_run_id();
        let logger = VideoLogger::new(&run_id, Path::new("/videos/match.mp4"));

        assert_eq!(logger.run_id(), run_id);
        assert_eq!(logger.input(), "/videos/match.mp4");
        assert!(Uuid::parse_str(logger.run_id()).is_ok());
    }
}
