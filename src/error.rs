//! Error types for Anirec.

use thiserror::Error;

/// Library-level error type for Anirec operations.
#[derive(Error, Debug)]
pub enum AnirecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tag catalog error: {0}")]
    Tags(String),

    #[error("AniList error: {0}")]
    AniList(String),

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Tool server error: {0}")]
    Mcp(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Anirec operations.
pub type Result<T> = std::result::Result<T, AnirecError>;
