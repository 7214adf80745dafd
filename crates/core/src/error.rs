//! Error types for the voice gateway

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the voice gateway
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Audio-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),

    #[error("Empty audio buffer")]
    Empty,

    #[error("Codec error: {0}")]
    Codec(String),
}

/// Failures reported by external collaborators
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Reply generation failed: {0}")]
    Reply(String),

    #[error("Knowledge lookup failed: {0}")]
    Knowledge(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// Session lifecycle errors, always caller errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already active: {0}")]
    AlreadyActive(String),

    #[error("Session {0} is no longer accepting input")]
    Closed(String),

    #[error("Session limit reached ({0})")]
    CapacityReached(usize),
}

impl Error {
    /// True for errors the caller caused rather than a backend or the engine
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Session(_)
                | Error::Audio(AudioError::InvalidFormat(_))
                | Error::Audio(AudioError::UnsupportedSampleRate(_))
        )
    }
}
