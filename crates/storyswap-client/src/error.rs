//! Error types for the Storyswap client.

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The backend rejected the request with an error body.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// No bearer token available for an authenticated call.
    #[error("not logged in")]
    NotAuthenticated,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
