//! # Event Stream Reader
//!
//! Opens the push channel and consumes it until it ends or the session is
//! cancelled:
//!
//! - `endpoint` events go to the [`EndpointResolver`](crate::EndpointResolver)
//! - `message` events are decoded and queued for the dispatch task
//! - every other event name is ignored
//!
//! Neither a bad endpoint nor a bad message stops the reader.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use mcp_core::deserialize_message;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap};
use reqwest::{Method, Url};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::Shared;
use crate::dispatch::{Inbox, spawn_dispatcher};
use crate::error::{Result, TransportError};
use crate::handler::{MessageHandler, RequestCustomizer};
use crate::sse::{SseEvent, parse_sse_events};

/// Event announcing the message endpoint.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// Event carrying one JSON-RPC message.
pub const MESSAGE_EVENT: &str = "message";

/// Boxed stream of parsed events.
pub type SseEventStream = Pin<Box<dyn Stream<Item = Result<SseEvent>> + Send>>;

/// Something that can open the server-push channel.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open the channel. Completes once events can be read.
    async fn open(&self) -> Result<SseEventStream>;
}

/// Event source backed by an HTTP GET with a `text/event-stream` body.
#[derive(Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    url: Url,
    headers: HeaderMap,
    customizer: Option<Arc<dyn RequestCustomizer>>,
}

impl HttpEventSource {
    /// Create a source that GETs `url`.
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self {
            client,
            url,
            headers: HeaderMap::new(),
            customizer: None,
        }
    }

    /// Extra headers sent with the GET.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Customizer applied to the GET.
    #[must_use]
    pub fn with_customizer(mut self, customizer: Arc<dyn RequestCustomizer>) -> Self {
        self.customizer = Some(customizer);
        self
    }

    /// Stream URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn open(&self) -> Result<SseEventStream> {
        let mut request = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(customizer) = &self.customizer {
            request = customizer
                .customize(request, &Method::GET, &self.url, None)
                .await;
        }

        debug!(url = %self.url, "opening event stream");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!(url = %self.url, "event stream open");
        Ok(Box::pin(parse_sse_events(response.bytes_stream())))
    }
}

/// Sending half of a [`ChannelEventSource`].
pub type EventSender = mpsc::UnboundedSender<Result<SseEvent>>;

/// In-process event source fed through a channel.
///
/// The stream ends when every [`EventSender`] is dropped. Can be opened once.
pub struct ChannelEventSource {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<SseEvent>>>>,
}

impl ChannelEventSource {
    /// Create a source and the sender that feeds it.
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                receiver: Mutex::new(Some(rx)),
            },
        )
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn open(&self) -> Result<SseEventStream> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| TransportError::stream("event channel already opened"))?;
        Ok(Box::pin(UnboundedReceiverStream::new(receiver)))
    }
}

/// Consume `events` until they end, fail, or `cancel` fires.
///
/// Decoded messages go to a dispatch task so the handler never blocks the
/// stream.
pub(crate) async fn run_reader(
    shared: Arc<Shared>,
    mut events: SseEventStream,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    let inbox = spawn_dispatcher(Arc::clone(&shared), handler, cancel.clone());
    let failure = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        failure = consume(&shared, &mut events, &inbox) => Some(failure),
    };
    shared.stream_finished(failure);
}

async fn consume(shared: &Shared, events: &mut SseEventStream, inbox: &Inbox) -> TransportError {
    loop {
        match events.next().await {
            Some(Ok(event)) => route(shared, inbox, event),
            Some(Err(e)) => return e,
            None => return TransportError::stream("event stream ended"),
        }
    }
}

fn route(shared: &Shared, inbox: &Inbox, event: SseEvent) {
    match event.event.as_str() {
        ENDPOINT_EVENT => {
            if let Err(e) = shared.resolver.resolve(&event.data) {
                shared.report(&e);
            }
        }
        MESSAGE_EVENT => match deserialize_message(&event.data) {
            Ok(message) => {
                if inbox.send(message).is_err() {
                    debug!("dispatcher gone, dropping inbound message");
                }
            }
            Err(e) => shared.report(&TransportError::Decode(e)),
        },
        other => debug!(event = other, "ignoring unrecognized event"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn channel_source_yields_sent_events() {
        let (tx, source) = ChannelEventSource::channel();
        tx.send(Ok(SseEvent::new(ENDPOINT_EVENT, "/rpc"))).unwrap();
        drop(tx);

        let events: Vec<_> = source.open().await.unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data, "/rpc");
    }

    #[tokio::test]
    async fn channel_source_opens_once() {
        let (_tx, source) = ChannelEventSource::channel();
        let _stream = source.open().await.unwrap();
        assert!(matches!(
            source.open().await,
            Err(TransportError::Stream { .. })
        ));
    }

    #[tokio::test]
    async fn http_source_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sse"))
            .and(header("accept", "text/event-stream"))
            .and(header("cache-control", "no-cache"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("event: endpoint\ndata: /rpc?id=1\n\n"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/sse", server.uri())).unwrap();
        let source = HttpEventSource::new(reqwest::Client::new(), url);
        let events: Vec<_> = source.open().await.unwrap().collect().await;
        assert_eq!(
            events[0].as_ref().unwrap(),
            &SseEvent::new(ENDPOINT_EVENT, "/rpc?id=1")
        );
    }

    #[tokio::test]
    async fn http_source_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no stream"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/sse", server.uri())).unwrap();
        let source = HttpEventSource::new(reqwest::Client::new(), url);
        let err = source.open().await.err().unwrap();
        assert_matches!(err, TransportError::HttpStatus { status: 404, ref body } if body == "no stream");
    }
}
