//! Hub error types.

use thiserror::Error;

/// Hub error type.
#[derive(Error, Debug)]
pub enum HubError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Not connected error
    #[error("Not connected to hub")]
    NotConnected,

    /// Group membership error
    #[error("Group error: {0}")]
    Group(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Send error
    #[error("Failed to send message: {0}")]
    Send(String),
}

/// Result type alias using HubError.
pub type HubResult<T> = Result<T, HubError>;
