//! JSON-RPC message types.
//!
//! Three message shapes travel over the transport:
//!
//! - [`JsonRpcRequest`]: has `method` and a non-null `id`, expects a response
//! - [`JsonRpcNotification`]: has `method`, no `id`, never answered
//! - [`JsonRpcResponse`]: has `id` and exactly one of `result` / `error`
//!
//! [`JsonRpcMessage`] serializes untagged and deserializes by inspecting
//! which keys are present, so the wire format carries no discriminator.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::JSONRPC_VERSION;
use crate::errors::{CodecError, Result};

/// Request identifier: a string or an integer, never null.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Integer identifier.
    Number(i64),
    /// String identifier.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for RequestId {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A call that expects a [`JsonRpcResponse`] with the same `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol tag, always `"2.0"` for messages built here.
    pub jsonrpc: String,
    /// Method name (e.g. `tools/call`).
    pub method: String,
    /// Correlation identifier.
    pub id: RequestId,
    /// Opaque parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with the current protocol tag.
    pub fn new(method: impl Into<String>, id: impl Into<RequestId>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            id: id.into(),
            params,
        }
    }
}

/// A one-way message; no response is ever produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol tag.
    pub jsonrpc: String,
    /// Method name (e.g. `notifications/initialized`).
    pub method: String,
    /// Opaque parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Build a notification with the current protocol tag.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params,
        }
    }
}

/// Structured error body inside a [`JsonRpcResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code (see [`crate::constants::error_codes`]).
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Build an error body without details.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Reply to a [`JsonRpcRequest`].
///
/// `id` is `None` only for errors raised before the request id could be read
/// (it serializes as `null`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol tag.
    pub jsonrpc: String,
    /// Echoed request identifier.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Success payload. `Some(Value::Null)` is a legitimate null result.
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether this response reports a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Any message that can travel over the transport.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// A call expecting a response.
    Request(JsonRpcRequest),
    /// A one-way message.
    Notification(JsonRpcNotification),
    /// A reply to an earlier request.
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Classify a parsed JSON value by its keys.
    ///
    /// `method` + `id` is a request, `method` alone a notification, and
    /// `result` or `error` without `method` a response.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(CodecError::UnknownShape(other.to_string())),
        };

        let has_method = map.contains_key("method");
        let has_id = map.contains_key("id");
        let has_result = map.contains_key("result");
        let has_error = map.contains_key("error");

        if has_method && has_id {
            check_request_id(&map)?;
            Ok(Self::Request(serde_json::from_value(Value::Object(map))?))
        } else if has_method {
            Ok(Self::Notification(serde_json::from_value(Value::Object(
                map,
            ))?))
        } else if has_result && has_error {
            Err(CodecError::UnknownShape(format!(
                "response carries both result and error: {}",
                Value::Object(map)
            )))
        } else if has_result || has_error {
            Ok(Self::Response(serde_json::from_value(Value::Object(map))?))
        } else {
            Err(CodecError::UnknownShape(Value::Object(map).to_string()))
        }
    }

    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// Correlation id for requests and responses.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => r.id.as_ref(),
            Self::Notification(_) => None,
        }
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Notification(_) => "notification",
            Self::Response(_) => "response",
        }
    }
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<JsonRpcRequest> for JsonRpcMessage {
    fn from(value: JsonRpcRequest) -> Self {
        Self::Request(value)
    }
}

impl From<JsonRpcNotification> for JsonRpcMessage {
    fn from(value: JsonRpcNotification) -> Self {
        Self::Notification(value)
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(value: JsonRpcResponse) -> Self {
        Self::Response(value)
    }
}

fn check_request_id(map: &Map<String, Value>) -> Result<()> {
    match map.get("id") {
        Some(Value::String(_)) => Ok(()),
        Some(Value::Number(n)) if n.is_i64() => Ok(()),
        Some(other) => Err(CodecError::InvalidRequestId(format!(
            "requests must carry a string or integer id, got {other}"
        ))),
        None => Err(CodecError::InvalidRequestId("missing".into())),
    }
}

fn deserialize_some<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
