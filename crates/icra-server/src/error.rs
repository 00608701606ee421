//! Error types for the server and its collaborators

/// Result type alias using the server's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling and running the server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),

    /// Message broker address or connection errors
    #[error("broker error: {0}")]
    Broker(String),

    /// Errors from the visit hub
    #[error(transparent)]
    Hub(#[from] icra_core::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }
}
