//! Error types for sandpit-core.

use thiserror::Error;

/// Result type alias for sandpit-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The control plane rejected the call
    #[error("{context} (HTTP {status}): {detail}")]
    Api {
        /// What the caller was trying to do
        context: String,
        /// HTTP status of the rejected call
        status: u16,
        /// Error detail reported by the control plane
        detail: String,
    },

    /// A success response did not carry what it must carry
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Tier name outside the catalog
    #[error("unknown VM tier: {0}")]
    UnknownTier(String),

    /// Privacy code outside 0..=2
    #[error("invalid privacy number: {0}")]
    InvalidPrivacy(i64),

    /// The request never produced a control-plane response
    #[error("transport error: {0}")]
    Transport(#[from] sandpit_api::ApiError),

    /// The real-time client failed to establish a session
    #[error("real-time client error: {0}")]
    Realtime(String),
}
