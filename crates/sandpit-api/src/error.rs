//! Error types for sandpit-api.

use thiserror::Error;

/// Result type alias for sandpit-api operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors raised by the transport itself, before a control-plane response
/// could be interpreted.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP request could not be sent or its body could not be read
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A success body did not match the expected envelope
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A side endpoint answered with a non-success status
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
