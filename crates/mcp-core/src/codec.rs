//! # Message Codec
//!
//! Text encoding for [`JsonRpcMessage`]. Inbound text is parsed to a generic
//! JSON value first and classified by key presence, so a payload that is
//! valid JSON but not a JSON-RPC message fails with
//! [`CodecError::UnknownShape`] rather than a positional serde error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::messages::JsonRpcMessage;

/// Serialize an outbound message to JSON text.
pub fn serialize_message(message: &JsonRpcMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Deserialize inbound JSON text into a request, notification, or response.
pub fn deserialize_message(text: &str) -> Result<JsonRpcMessage> {
    debug!(payload = text, "decoding JSON-RPC message");
    let value: Value = serde_json::from_str(text)?;
    JsonRpcMessage::from_value(value)
}

/// Convert an opaque `params` or `result` value into a typed struct.
pub fn unmarshal_from<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
