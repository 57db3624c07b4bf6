//! # SSE Events
//!
//! Adapts [`eventsource_stream`] to the transport's event and error types.
//! Line endings (`\n`, `\r\n`, `\r`), chunk boundaries, comments, and
//! multi-line `data:` are handled by the parser; this module maps its output.

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt, future};

use crate::error::TransportError;

/// Event name used when a block carries no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One dispatched server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name (`endpoint`, `message`, ...).
    pub event: String,
    /// Payload, with multi-line data joined by `\n`.
    pub data: String,
    /// Last event id seen on the stream.
    pub id: Option<String>,
}

impl SseEvent {
    /// Build an event without an id.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }
}

impl From<Event> for SseEvent {
    fn from(event: Event) -> Self {
        Self {
            event: if event.event.is_empty() {
                DEFAULT_EVENT_NAME.to_owned()
            } else {
                event.event
            },
            data: event.data,
            id: Some(event.id).filter(|id| !id.is_empty()),
        }
    }
}

fn stream_error<E>(error: EventStreamError<E>) -> TransportError
where
    E: Into<TransportError> + std::fmt::Display,
{
    match error {
        EventStreamError::Transport(e) => e.into(),
        other => TransportError::stream(format!("malformed event stream: {other}")),
    }
}

/// Parse a byte stream into [`SseEvent`]s.
///
/// A read or decode error is yielded once and ends the stream.
pub fn parse_sse_events<S, B, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<SseEvent, TransportError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TransportError> + std::fmt::Display + Send + 'static,
{
    byte_stream
        .eventsource()
        .map(|item| item.map(SseEvent::from).map_err(stream_error))
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, TransportError>> + Send + 'static {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&'static str]) -> Vec<SseEvent> {
        parse_sse_events(chunks(parts))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[test]
    fn empty_name_maps_to_message() {
        let event = SseEvent::from(Event {
            event: String::new(),
            data: "x".into(),
            id: String::new(),
            retry: None,
        });
        assert_eq!(event, SseEvent::new(DEFAULT_EVENT_NAME, "x"));
    }

    #[tokio::test]
    async fn endpoint_then_message() {
        let events = collect(&[
            "event: endpoint\ndata: /message?sessionId=1\n\nevent: message\ndata: {\"jsonrpc\":\"2.0\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SseEvent::new("endpoint", "/message?sessionId=1"));
        assert_eq!(events[1].event, "message");
        assert_eq!(events[1].data, "{\"jsonrpc\":\"2.0\"}");
    }

    #[tokio::test]
    async fn split_across_chunks() {
        let events = collect(&["event: mess", "age\ndata: {\"par", "tial\":true}\n", "\n"]).await;
        assert_eq!(events, vec![SseEvent::new("message", "{\"partial\":true}")]);
    }

    #[tokio::test]
    async fn multi_line_data_joined() {
        let events = collect(&["data: line1\ndata: line2\n\n"]).await;
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[tokio::test]
    async fn default_event_name_is_message() {
        let events = collect(&["data: x\n\n"]).await;
        assert_eq!(events[0].event, DEFAULT_EVENT_NAME);
    }

    #[tokio::test]
    async fn crlf_endings_and_id() {
        let events = collect(&["event: endpoint\r\ndata: /rpc\r\nid: 7\r\n\r\n"]).await;
        assert_eq!(events[0].data, "/rpc");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn bare_carriage_return_endings() {
        let events = collect(&["event: endpoint\rdata: /rpc\r\r: keep-alive\n"]).await;
        assert_eq!(events, vec![SseEvent::new("endpoint", "/rpc")]);
    }

    #[tokio::test]
    async fn comments_and_empty_blocks_dropped() {
        let events = collect(&[": ping\n\nevent: endpoint\n\ndata: kept\n\n"]).await;
        assert_eq!(events, vec![SseEvent::new("message", "kept")]);
    }

    #[tokio::test]
    async fn read_error_yielded_then_ends() {
        let parts: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from("data: a\n\n")),
            Err(TransportError::stream("reset by peer")),
            Ok(Bytes::from("data: b\n\n")),
        ];
        let results: Vec<_> = parse_sse_events(futures::stream::iter(parts))
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(TransportError::Stream { message }) if message == "reset by peer"
        ));
    }

    #[tokio::test]
    async fn invalid_utf8_fails_stream() {
        let parts: Vec<Result<Bytes, TransportError>> =
            vec![Ok(Bytes::from_static(b"data: \xff\xfe\n\n"))];
        let results: Vec<_> = parse_sse_events(futures::stream::iter(parts))
            .collect()
            .await;
        assert!(matches!(results.last(), Some(Err(TransportError::Stream { .. }))));
    }

    #[tokio::test]
    async fn empty_stream() {
        assert!(collect(&[]).await.is_empty());
    }
}
