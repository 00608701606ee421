//! Error types for the visit stream

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hub and relay operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors, fatal at construction
    #[error("configuration error: {0}")]
    Config(String),

    /// A subscriber's transport failed or was closed
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
