//! Error types for the debate system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Invalid role count: at least {min} speaking roles are required, got {actual}")]
    InvalidRoleCount { min: usize, actual: usize },

    #[error("Duplicate role id: {0}")]
    DuplicateRoleId(String),

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("Generation failed for {role}: {message}")]
    Generation { role: String, message: String },

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
