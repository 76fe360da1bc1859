//! Error types for the assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
///
/// Action failures are not represented here: they are captured as
/// [`crate::actions::ActionError`] values and fed back to the backend.
/// Only [`Error::Backend`] and [`Error::LoopExceeded`] terminate a
/// command loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Communication with the generative backend failed
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend kept requesting actions past the round-trip bound
    #[error("command loop exceeded {bound} action round-trips")]
    LoopExceeded {
        /// Configured round-trip bound
        bound: usize,
    },

    /// A recording/processing cycle is already in flight
    #[error("assistant is busy: {0}")]
    Busy(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

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

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether this error ends a command loop (as opposed to a local failure)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::LoopExceeded { .. })
    }
}
