//! Transport error taxonomy.

use mcp_core::CodecError;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by the SSE client transport.
///
/// Each failure is local to the operation that caused it: a bad inbound
/// message does not fail the session and a failed send does not affect the
/// stream. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Outbound message could not be encoded. No network attempt was made.
    #[error("failed to serialize message: {0}")]
    Serialization(#[source] CodecError),

    /// Inbound `message` event did not decode to a JSON-RPC message.
    #[error("failed to decode inbound message: {0}")]
    Decode(#[source] CodecError),

    /// The announced endpoint is malformed or escapes the base URL.
    #[error("endpoint {endpoint:?} rejected: {reason}")]
    EndpointValidation {
        /// Raw payload of the `endpoint` event.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Network failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status outside the accepted set.
    #[error("request failed with non-success HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The push channel ended or errored.
    #[error("event stream failed: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// `connect` was called on a transport that is not idle.
    #[error("transport already connected")]
    AlreadyConnected,

    /// Invalid URL, header, or client configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Error category string for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Decode(_) => "decode",
            Self::EndpointValidation { .. } => "endpoint",
            Self::Http(_) | Self::HttpStatus { .. } => "network",
            Self::Stream { .. } => "stream",
            Self::AlreadyConnected | Self::InvalidConfig(_) => "config",
        }
    }

    pub(crate) fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display_carries_body() {
        let err = TransportError::HttpStatus {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with non-success HTTP status 503: overloaded"
        );
        assert_eq!(err.category(), "network");
    }

    #[test]
    fn endpoint_validation_display() {
        let err = TransportError::EndpointValidation {
            endpoint: "http://evil.example/x".into(),
            reason: "authority mismatch".into(),
        };
        assert!(err.to_string().contains("evil.example"));
        assert_eq!(err.category(), "endpoint");
    }

    #[test]
    fn decode_keeps_codec_source() {
        let codec = mcp_core::deserialize_message("{not json").unwrap_err();
        let err = TransportError::Decode(codec);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.category(), "decode");
    }

    #[test]
    fn categories() {
        assert_eq!(TransportError::stream("eof").category(), "stream");
        assert_eq!(TransportError::AlreadyConnected.category(), "config");
        assert_eq!(
            TransportError::InvalidConfig("bad".into()).category(),
            "config"
        );
    }
}
