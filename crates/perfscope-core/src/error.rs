//! Error types for Perfscope

use thiserror::Error;

/// Result type alias using Perfscope's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Perfscope operations
#[derive(Error, Debug)]
pub enum Error {
    /// Required local input is missing; never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote service could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The request failed in flight or the response could not be decoded
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a failure status
    #[error("Remote error ({status}): {detail}")]
    Remote { status: u16, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal UI error
    #[error("TUI error: {0}")]
    Tui(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote status error
    pub fn remote(status: u16, detail: impl Into<String>) -> Self {
        Self::Remote {
            status,
            detail: detail.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was raised locally before any network call
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Text suitable for an operator notification.
    ///
    /// Remote failures surface the service's own `detail`; everything else
    /// falls back to `fallback` so the operator sees what was being attempted.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Remote { detail, .. } if !detail.is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Remote {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}
