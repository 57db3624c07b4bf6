//! Caller-supplied hooks: inbound message handler, exception sink, and
//! request customizer.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_core::JsonRpcMessage;
use reqwest::{Method, RequestBuilder, Url};

use crate::error::TransportError;

/// Handles decoded inbound messages, optionally producing a reply.
///
/// Bound once at `connect` and invoked in stream order. A returned reply is
/// sent through the same endpoint-gated path as `send_message`. Request
/// correlation and business dispatch live behind this trait.
///
/// Implemented for async closures:
///
/// ```ignore
/// let handler = |message: JsonRpcMessage| async move { None };
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one inbound message.
    async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(JsonRpcMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Option<JsonRpcMessage>> + Send + 'static,
{
    async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        (self)(message).await
    }
}

/// Sink for transport failures that are not suppressed by a graceful close.
pub type ExceptionHandler = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Amends every outgoing HTTP request (the stream GET and each POST).
///
/// Typical use is attaching credentials that must be computed per request.
#[async_trait]
pub trait RequestCustomizer: Send + Sync {
    /// Return the request to send. `body` is `None` for the stream GET.
    async fn customize(
        &self,
        request: RequestBuilder,
        method: &Method,
        url: &Url,
        body: Option<&str>,
    ) -> RequestBuilder;
}

/// Customizer that adds one fixed header to every request.
#[derive(Clone, Debug)]
pub struct StaticHeader {
    name: String,
    value: String,
}

impl StaticHeader {
    /// Create a customizer for `name: value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl RequestCustomizer for StaticHeader {
    async fn customize(
        &self,
        request: RequestBuilder,
        _method: &Method,
        _url: &Url,
        _body: Option<&str>,
    ) -> RequestBuilder {
        request.header(self.name.as_str(), self.value.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
