//! Error types for Ringe.

use thiserror::Error;

/// Library-level error type for Ringe operations.
#[derive(Error, Debug)]
pub enum RingeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Call data not found: {0}. Add call files there or point [calls] at the right location.")]
    DataNotFound(String),

    #[error("Call data error: {0}")]
    CallData(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Tagging failed: {0}")]
    Tagging(String),

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("LLM backend error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Ringe operations.
pub type Result<T> = std::result::Result<T, RingeError>;
