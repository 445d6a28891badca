//! Worker error types.

use thiserror::Error;

use reelcut_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No viable highlight segments: {0}")]
    NoHighlights(String),

    #[error("Subtitle generation failed: {0}")]
    SubtitleFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn no_highlights(msg: impl Into<String>) -> Self {
        Self::NoHighlights(msg.into())
    }

    pub fn subtitle_failed(msg: impl Into<String>) -> Self {
        Self::SubtitleFailed(msg.into())
    }

    /// Short user-facing message, carrying the tool's stderr tail for media errors.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Media(e) => e.diagnostic(),
            other => other.to_string(),
        }
    }

    /// Whether the failure is a missing external tool.
    pub fn is_fatal_precondition(&self) -> bool {
        matches!(self, Self::Media(e) if e.is_missing_tool())
    }
}
