//! Error types for voice-studio

use thiserror::Error;

/// Result type alias for voice-studio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voice-studio
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error (capture or playback)
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Transcription error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Live session error (connection, transport)
    #[error("live session error: {0}")]
    Session(String),

    /// Audio payload decode error
    #[error("decode error: {0}")]
    Decode(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
