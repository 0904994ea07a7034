//! Error types for Beacon speaker

use thiserror::Error;

/// Result type alias for Beacon speaker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a speaker
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Required device service unavailable at startup
    #[error("initialization error: {0}")]
    Init(String),

    /// Device rejected or failed a command
    #[error("device error: {0}")]
    Device(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Voice catalog error
    #[error("voice catalog error: {0}")]
    Catalog(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
