//! # mcp-sse
//!
//! Client transport for the Model Context Protocol over HTTP Server-Sent
//! Events.
//!
//! The server pushes JSON-RPC messages on one long-lived GET. Before the
//! client can send anything, the server announces (via an `endpoint` event)
//! the URL that outbound messages are POSTed to.
//!
//! ## Module Structure
//!
//! - [`sse`]: byte stream to named events, via `eventsource-stream`
//! - [`endpoint`]: single-assignment, validated message endpoint
//! - [`reader`]: event sources and the stream consumer
//! - [`sender`]: HTTP POST of encoded messages
//! - [`handler`]: caller hooks (message handler, exception sink, customizer)
//! - [`transport`]: transport traits and lifecycle state
//! - [`client`]: [`HttpClientSseClientTransport`] and its builder
//!
//! ## Usage
//!
//! ```ignore
//! let transport = HttpClientSseClientTransport::builder("http://localhost:8080")
//!     .request_timeout(Duration::from_secs(30))
//!     .build()?;
//! transport
//!     .connect(Arc::new(|message: JsonRpcMessage| async move { None }))
//!     .await?;
//! transport.send_message(request.into()).await?;
//! transport.close_gracefully().await;
//! ```

#![deny(unsafe_code)]

pub mod client;
mod dispatch;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod reader;
pub mod sender;
pub mod sse;
pub mod transport;

pub use client::{HttpClientSseClientTransport, HttpClientSseClientTransportBuilder};
pub use endpoint::{EndpointRejection, EndpointResolver, Unresolved, resolve_endpoint_url};
pub use error::{Result, TransportError};
pub use handler::{ExceptionHandler, MessageHandler, RequestCustomizer, StaticHeader};
pub use reader::{
    ChannelEventSource, ENDPOINT_EVENT, EventSender, EventSource, HttpEventSource, MESSAGE_EVENT,
    SseEventStream,
};
pub use sender::is_success_status;
pub use sse::{DEFAULT_EVENT_NAME, SseEvent, parse_sse_events};
pub use transport::{McpClientTransport, McpTransport, TransportState};
