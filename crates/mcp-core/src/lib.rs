//! # mcp-core
//!
//! Foundation types for the MCP client transport.
//!
//! This crate provides the shared vocabulary the transport crates depend on:
//!
//! - **Messages**: [`JsonRpcMessage`] with `Request`, `Notification`, `Response` variants
//! - **Codec**: text encode/decode with key-based shape disambiguation
//! - **Constants**: JSON-RPC version, protocol versions, method names, error codes
//! - **Errors**: [`CodecError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and in-memory log capture for tests

#![deny(unsafe_code)]

pub mod codec;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod messages;

pub use codec::{deserialize_message, serialize_message, unmarshal_from};
pub use errors::{CodecError, Result};
pub use messages::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
