//! Transport-facing traits and lifecycle state.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::JsonRpcMessage;
use mcp_core::constants::PROTOCOL_VERSION_2024_11_05;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TransportError};
use crate::handler::{ExceptionHandler, MessageHandler};

/// Lifecycle of a client transport.
///
/// ```text
/// Idle ──connect──▶ Connecting ──stream open──▶ Streaming
///                        │                         │
///                        ▼                         ▼
///                      Failed ◀──stream error── Streaming
///
/// any ──close_gracefully──▶ Closing ──reader stopped──▶ Closed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// Built, not yet connected.
    Idle,
    /// Stream GET in flight.
    Connecting,
    /// Stream open; events are being consumed.
    Streaming,
    /// Close requested; the reader has not stopped yet.
    Closing,
    /// Closed by the caller.
    Closed,
    /// The stream failed or could not be opened.
    Failed,
}

impl TransportState {
    /// Whether the transport reached a state it will never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Message transport shared by client and server sides.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Stop the session, suppressing errors from work still in flight.
    ///
    /// Idempotent. Completes without waiting for the reader to exit.
    async fn close_gracefully(&self);

    /// Fire-and-forget variant of [`close_gracefully`](Self::close_gracefully).
    fn close(&self);

    /// Send one message, waiting for the message endpoint if necessary.
    ///
    /// Completes once the server accepted the POST. After a close has begun
    /// the message is dropped and `Ok(())` is returned.
    async fn send_message(&self, message: JsonRpcMessage) -> Result<()>;

    /// Protocol versions this transport can carry.
    fn protocol_versions(&self) -> Vec<String> {
        vec![PROTOCOL_VERSION_2024_11_05.to_owned()]
    }

    /// Convert a generic JSON value (typically a `result` or `params`) into a
    /// typed value.
    fn unmarshal_from<T: DeserializeOwned>(&self, value: Value) -> Result<T>
    where
        Self: Sized,
    {
        mcp_core::unmarshal_from(value).map_err(TransportError::Decode)
    }
}

/// Client side of an MCP transport.
#[async_trait]
pub trait McpClientTransport: McpTransport {
    /// Open the push channel and start dispatching inbound messages.
    ///
    /// Completes once the stream is open. Only valid from
    /// [`TransportState::Idle`].
    async fn connect(&self, handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Install the sink for failures not suppressed by a close.
    ///
    /// Only the first installed sink is used.
    fn set_exception_handler(&self, handler: ExceptionHandler);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
