//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding JSON-RPC messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text was not valid JSON, or a typed conversion failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that matches none of request, notification, or response.
    #[error("cannot deserialize JSON-RPC message: {0}")]
    UnknownShape(String),

    /// A request carried an `id` that is null or not a string/integer.
    #[error("invalid request id: {0}")]
    InvalidRequestId(String),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
