//! End-to-end runs against a mock server serving a real `text/event-stream`
//! body.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use mcp_core::{JsonRpcMessage, JsonRpcResponse};
use mcp_sse::{
    HttpClientSseClientTransport, McpClientTransport, McpTransport, StaticHeader, TransportError,
    TransportState,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(frames: &[(&str, &str)]) -> String {
    frames
        .iter()
        .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
        .collect()
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/sse"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn recording_sink() -> (Arc<Mutex<Vec<String>>>, mcp_sse::ExceptionHandler) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let handler: mcp_sse::ExceptionHandler = Arc::new(move |e: &TransportError| {
        sink.lock().push(e.category().to_owned());
    });
    (errors, handler)
}

#[tokio::test]
async fn ping_round_trip_over_http() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse_body(&[
            ("endpoint", "/message?sessionId=abc"),
            ("message", r#"{"jsonrpc":"2.0","method":"ping","id":1}"#),
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .and(query_param("sessionId", "abc"))
        .and(body_partial_json(json!({"id": 1, "result": {}})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let (errors, sink) = recording_sink();
    let transport = HttpClientSseClientTransport::builder(server.uri())
        .exception_handler(sink)
        .build()
        .unwrap();

    let (tx, mut inbound) = mpsc::unbounded_channel();
    let handler = move |message: JsonRpcMessage| {
        let tx = tx.clone();
        async move {
            let reply = match &message {
                JsonRpcMessage::Request(req) => Some(JsonRpcMessage::from(
                    JsonRpcResponse::success(req.id.clone(), json!({})),
                )),
                _ => None,
            };
            let _ = tx.send(message);
            reply
        }
    };
    transport.connect(Arc::new(handler)).await.unwrap();

    let message = inbound.recv().await.unwrap();
    assert_eq!(message.method(), Some("ping"));
    assert_eq!(
        transport.endpoint_ready().await.unwrap().as_str(),
        format!("{}/message?sessionId=abc", server.uri())
    );

    // the body ends after two frames, so the session fails once the reply lands
    for _ in 0..200 {
        let posted = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|r| r.method.as_str() == "POST");
        if posted && transport.state() == TransportState::Failed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(transport.state(), TransportState::Failed);
    assert!(errors.lock().iter().any(|c| c == "stream"));
}

#[tokio::test]
async fn connect_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let transport = HttpClientSseClientTransport::builder(server.uri())
        .build()
        .unwrap();
    let handler = |_message: JsonRpcMessage| async move { None::<JsonRpcMessage> };

    assert_matches!(
        transport.connect(Arc::new(handler)).await,
        Err(TransportError::HttpStatus { status: 404, .. })
    );
    assert_eq!(transport.state(), TransportState::Failed);
    assert_matches!(
        transport.send_message(JsonRpcMessage::from(mcp_core::JsonRpcNotification::new(
            "notifications/initialized",
            None
        )))
        .await,
        Err(TransportError::Stream { .. })
    );
}

#[tokio::test]
async fn headers_and_customizer_reach_both_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sse"))
        .and(header("authorization", "Bearer t"))
        .and(header("x-api-key", "k"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&[("endpoint", "rpc")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/rpc"))
        .and(header("authorization", "Bearer t"))
        .and(header("x-api-key", "k"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpClientSseClientTransport::builder(format!("{}/api/", server.uri()))
        .sse_endpoint("sse")
        .header("Authorization", "Bearer t")
        .request_customizer(Arc::new(StaticHeader::new("x-api-key", "k")))
        .build()
        .unwrap();
    let handler = |_message: JsonRpcMessage| async move { None::<JsonRpcMessage> };
    transport.connect(Arc::new(handler)).await.unwrap();

    let endpoint = transport.endpoint_ready().await.unwrap();
    assert_eq!(endpoint.path(), "/api/rpc");

    transport
        .send_message(JsonRpcMessage::from(mcp_core::JsonRpcRequest::new(
            "tools/list",
            1,
            None,
        )))
        .await
        .unwrap();
    transport.close_gracefully().await;
}
