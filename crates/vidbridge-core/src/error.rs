//! Error types for VidBridge Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Load errors
    #[error("Failed to load {url}: {reason}")]
    Load { url: String, reason: String },

    // Engine errors
    #[error("Engine failure: {0}")]
    EngineFailure(String),

    // Handle errors
    #[error("Invalid instance handle {handle} (registry holds {len})")]
    InvalidHandle { handle: usize, len: usize },

    // Playback errors
    #[error("Invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("No media loaded")]
    NoMedia,

    #[error("Player task has shut down")]
    PlayerClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a load error
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable without reloading the instance
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidHandle { .. } | Error::InvalidStateTransition { .. } | Error::NoMedia
        )
    }

    /// Returns the error code reported to the host
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Load { .. } => "LOAD",
            Error::EngineFailure(_) => "ENGINE_FAILURE",
            Error::InvalidHandle { .. } => "INVALID_HANDLE",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::NoMedia => "NO_MEDIA",
            Error::PlayerClosed => "PLAYER_CLOSED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}
