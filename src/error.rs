//! Error types for Scout.

use thiserror::Error;

/// Library-level error type for Scout operations.
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Search provider failed: {0}")]
    Provider(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ScoutError>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No API key configured. Set {0} or pass one explicitly.")]
    MissingApiKey(String),
}

/// Result type alias for Scout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;
