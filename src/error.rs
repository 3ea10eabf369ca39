use thiserror::Error;

use crate::stage::StageName;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The stage capability could not be started at all.
    #[error("Failed to launch {stage} stage: {message}")]
    StageLaunch { stage: StageName, message: String },

    #[error("{stage} stage did not finish within {secs}s")]
    StageTimeout { stage: StageName, secs: u64 },

    /// No structured verdict could be obtained for an artifact.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
