//! # SSE Client Transport
//!
//! [`HttpClientSseClientTransport`] ties the pieces together:
//!
//! - the reader task consumes the push channel and queues messages for dispatch
//! - `send_message` waits for the endpoint and POSTs
//! - the closing flag suppresses teardown noise and drops late sends
//!
//! The closing flag and the endpoint cell are the only state shared between
//! the reader and concurrent senders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use mcp_core::{JsonRpcMessage, serialize_message};
use mcp_settings::TransportSettings;
use mcp_settings::types::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SSE_ENDPOINT};
use parking_lot::Mutex;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::endpoint::{EndpointResolver, Unresolved};
use crate::error::{Result, TransportError};
use crate::handler::{ExceptionHandler, MessageHandler, RequestCustomizer};
use crate::reader::{EventSource, HttpEventSource, run_reader};
use crate::sender::MessagePoster;
use crate::transport::{McpClientTransport, McpTransport, TransportState};

/// State reachable from the reader task, reply tasks, and callers.
pub(crate) struct Shared {
    pub(crate) resolver: EndpointResolver,
    poster: MessagePoster,
    closing: AtomicBool,
    exception_handler: OnceLock<ExceptionHandler>,
    state: Mutex<TransportState>,
}

impl Shared {
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Forward a failure to the exception sink unless the session is closing.
    pub(crate) fn report(&self, error: &TransportError) {
        if self.is_closing() {
            debug!(error = %error, "suppressed transport error during close");
            return;
        }
        error!(category = error.category(), error = %error, "transport error");
        if let Some(handler) = self.exception_handler.get() {
            handler(error);
        }
    }

    /// Full outbound path.
    ///
    /// Serialization and POST failures are reported before being returned.
    /// An endpoint that never became usable was already reported where it
    /// failed, so waiting senders only get the error back.
    pub(crate) async fn send(&self, message: JsonRpcMessage) -> Result<()> {
        if self.is_closing() {
            debug!("dropping outbound message, transport closing");
            return Ok(());
        }

        let body = serialize_message(&message)
            .map_err(TransportError::Serialization)
            .inspect_err(|e| self.report(e))?;
        let resolved = self.resolver.wait().await;

        // a close that began while waiting wins over any resolution outcome
        if self.is_closing() {
            debug!("dropping outbound message, transport closing");
            return Ok(());
        }

        let endpoint = match resolved {
            Ok(url) => url,
            Err(Unresolved::Rejected(rejection)) => return Err(rejection.into()),
            Err(Unresolved::Closed) => {
                return Err(TransportError::stream(
                    "event stream ended before an endpoint was announced",
                ));
            }
        };

        debug!(
            endpoint = %endpoint,
            kind = message.kind(),
            method = message.method().unwrap_or_default(),
            "sending message"
        );
        self.poster
            .post(&endpoint, body)
            .await
            .inspect_err(|e| self.report(e))
    }

    fn state(&self) -> TransportState {
        *self.state.lock()
    }

    /// Called once by the reader when it stops.
    ///
    /// Pending senders are released last, after the state is final.
    pub(crate) fn stream_finished(&self, failure: Option<TransportError>) {
        match failure.filter(|_| !self.is_closing()) {
            None => {
                debug!("event stream stopped");
                *self.state.lock() = TransportState::Closed;
            }
            Some(e) => {
                self.report(&e);
                *self.state.lock() = TransportState::Failed;
            }
        }
        self.resolver.close();
    }
}

/// MCP client transport over HTTP Server-Sent Events.
///
/// Inbound messages arrive on a long-lived GET; outbound messages are POSTed
/// to the endpoint the server announces on that stream. Cloning yields
/// another handle to the same session.
#[derive(Clone)]
pub struct HttpClientSseClientTransport {
    shared: Arc<Shared>,
    sse_url: Url,
    event_source: Arc<dyn EventSource>,
    subscription: Arc<Mutex<Option<CancellationToken>>>,
}

impl std::fmt::Debug for HttpClientSseClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientSseClientTransport")
            .field("base_url", &self.shared.resolver.base_url().as_str())
            .field("sse_url", &self.sse_url.as_str())
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

impl HttpClientSseClientTransport {
    /// Start building a transport for the server at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpClientSseClientTransportBuilder {
        HttpClientSseClientTransportBuilder::new(base_url)
    }

    /// Build a transport from loaded settings.
    pub fn from_settings(settings: &TransportSettings) -> Result<Self> {
        HttpClientSseClientTransportBuilder::from_settings(settings)?.build()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    /// Whether a close has begun.
    pub fn is_closing(&self) -> bool {
        self.shared.is_closing()
    }

    /// The message endpoint, if already resolved.
    pub fn endpoint(&self) -> Option<Url> {
        self.shared.resolver.current()
    }

    /// Wait until the server announced a usable endpoint.
    pub async fn endpoint_ready(&self) -> Result<Url> {
        self.shared.resolver.wait().await.map_err(|unresolved| match unresolved {
            Unresolved::Rejected(rejection) => rejection.into(),
            Unresolved::Closed => {
                TransportError::stream("transport stopped before an endpoint was announced")
            }
        })
    }

    /// Base URL endpoints are validated against.
    pub fn base_url(&self) -> &Url {
        self.shared.resolver.base_url()
    }

    /// URL of the event stream.
    pub fn sse_url(&self) -> &Url {
        &self.sse_url
    }

    fn shutdown(&self) {
        if self.shared.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(url = %self.sse_url, "closing transport");

        self.shared.resolver.close();
        let subscription = self.subscription.lock().take();

        {
            let mut state = self.shared.state.lock();
            if !state.is_terminal() {
                *state = if subscription.is_some() {
                    TransportState::Closing
                } else {
                    TransportState::Closed
                };
            }
        }

        if let Some(cancel) = subscription {
            cancel.cancel();
        }
    }
}

#[async_trait]
impl McpTransport for HttpClientSseClientTransport {
    async fn close_gracefully(&self) {
        self.shutdown();
    }

    fn close(&self) {
        self.shutdown();
    }

    async fn send_message(&self, message: JsonRpcMessage) -> Result<()> {
        self.shared.send(message).await
    }
}

#[async_trait]
impl McpClientTransport for HttpClientSseClientTransport {
    async fn connect(&self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if *state != TransportState::Idle {
                return Err(TransportError::AlreadyConnected);
            }
            *state = TransportState::Connecting;
        }

        info!(url = %self.sse_url, "connecting event stream");
        let events = match self.event_source.open().await {
            Ok(events) => events,
            Err(e) => {
                self.shared.resolver.close();
                if !self.is_closing() {
                    *self.shared.state.lock() = TransportState::Failed;
                }
                warn!(url = %self.sse_url, error = %e, "failed to open event stream");
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        {
            // closing is set before the subscription lock is taken in shutdown
            let mut subscription = self.subscription.lock();
            if self.is_closing() {
                debug!("transport closed while connecting, dropping stream");
                *self.shared.state.lock() = TransportState::Closed;
                return Ok(());
            }
            *subscription = Some(cancel.clone());
            *self.shared.state.lock() = TransportState::Streaming;
        }

        let _ = tokio::spawn(run_reader(
            Arc::clone(&self.shared),
            events,
            handler,
            cancel,
        ));
        Ok(())
    }

    fn set_exception_handler(&self, handler: ExceptionHandler) {
        if self.shared.exception_handler.set(handler).is_err() {
            warn!("exception handler already installed, ignoring replacement");
        }
    }
}

/// Builder for [`HttpClientSseClientTransport`].
#[must_use]
pub struct HttpClientSseClientTransportBuilder {
    base_url: String,
    sse_endpoint: String,
    http_client: Option<reqwest::Client>,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    headers: Vec<(String, String)>,
    customizer: Option<Arc<dyn RequestCustomizer>>,
    exception_handler: Option<ExceptionHandler>,
    event_source: Option<Arc<dyn EventSource>>,
}

impl HttpClientSseClientTransportBuilder {
    /// Builder with defaults: stream at `/sse`, 10 s connect timeout, no
    /// request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            sse_endpoint: DEFAULT_SSE_ENDPOINT.to_owned(),
            http_client: None,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: None,
            headers: Vec::new(),
            customizer: None,
            exception_handler: None,
            event_source: None,
        }
    }

    /// Builder populated from settings.
    pub fn from_settings(settings: &TransportSettings) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        let mut builder = Self::new(settings.base_url.clone())
            .sse_endpoint(settings.sse_endpoint.clone())
            .connect_timeout(settings.connect_timeout());
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.request_timeout(timeout);
        }
        for (name, value) in &settings.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        Ok(builder)
    }

    /// Path of the event stream, resolved against the base URL.
    pub fn sse_endpoint(mut self, sse_endpoint: impl Into<String>) -> Self {
        self.sse_endpoint = sse_endpoint.into();
        self
    }

    /// Use a preconfigured client. The connect timeout is then ignored.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Connect timeout for the built-in client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound on each message POST.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Header sent on the stream GET and every POST.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Hook applied to every outgoing request.
    pub fn request_customizer(mut self, customizer: Arc<dyn RequestCustomizer>) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Sink for unsuppressed failures.
    pub fn exception_handler(mut self, handler: ExceptionHandler) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// Replace the HTTP event stream with another source.
    pub fn event_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.event_source = Some(source);
        self
    }

    /// Validate the configuration and build the transport.
    pub fn build(self) -> Result<HttpClientSseClientTransport> {
        let base_url = Url::parse(&self.base_url).map_err(|e| {
            TransportError::InvalidConfig(format!("base URL {:?}: {e}", self.base_url))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidConfig(format!(
                "base URL must be http or https, got {}",
                base_url.scheme()
            )));
        }
        let sse_url = base_url.join(&self.sse_endpoint).map_err(|e| {
            TransportError::InvalidConfig(format!("SSE endpoint {:?}: {e}", self.sse_endpoint))
        })?;

        let headers = parse_headers(&self.headers)?;
        let client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout)
                .build()
                .map_err(|e| TransportError::InvalidConfig(format!("HTTP client: {e}")))?,
        };

        let event_source = match self.event_source {
            Some(source) => source,
            None => {
                let mut source =
                    HttpEventSource::new(client.clone(), sse_url.clone()).with_headers(headers.clone());
                if let Some(customizer) = &self.customizer {
                    source = source.with_customizer(Arc::clone(customizer));
                }
                Arc::new(source)
            }
        };

        let exception_handler = OnceLock::new();
        if let Some(handler) = self.exception_handler {
            let _ = exception_handler.set(handler);
        }

        debug!(base_url = %base_url, sse_url = %sse_url, "built SSE client transport");
        Ok(HttpClientSseClientTransport {
            shared: Arc::new(Shared {
                resolver: EndpointResolver::new(base_url),
                poster: MessagePoster::new(client, headers, self.request_timeout, self.customizer),
                closing: AtomicBool::new(false),
                exception_handler,
                state: Mutex::new(TransportState::Idle),
            }),
            sse_url,
            event_source,
            subscription: Arc::new(Mutex::new(None)),
        })
    }
}

fn parse_headers(pairs: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidConfig(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidConfig(format!("header {name} value: {e}")))?;
        let _ = headers.insert(name, value);
    }
    Ok(headers)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
