// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::time::Duration;

use axum::http::{HeaderMap as AxumHeaders, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::mpsc;

async fn echo(headers: AxumHeaders, Json(request): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({
        "jsonrpc": "2.0",
        "id": request["id"],
        "result": {"params": request["params"], "auth": auth, "contentType": content_type}
    }))
}

async fn sse(Json(request): Json<Value>) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let message = json!({"jsonrpc": "2.0", "id": request["id"], "result": {"via": "sse"}});
    (
        StatusCode::OK,
        [("content-type", "text/event-stream")],
        format!("event: message\ndata: {}\n\n", message),
    )
}

async fn slow(Json(request): Json<Value>) -> Json<Value> {
    let delay = request["params"]["delayMs"].as_u64().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(delay)).await;
    Json(json!({"jsonrpc": "2.0", "id": request["id"], "result": {"delayMs": delay}}))
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/echo", post(echo))
        .route("/sse", post(sse))
        .route("/slow", post(slow))
        .route("/boom", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/garbage", post(|| async { "definitely not json" }))
        .route("/accepted", post(|| async { StatusCode::ACCEPTED }))
        .route("/anonymous", post(|| async { Json(json!({"jsonrpc": "2.0", "id": 999, "result": {}})) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn transport(url: String, authorization: Option<&str>) -> (HttpTransport, mpsc::UnboundedReceiver<TransportEvent>) {
    let (sink, events) = mpsc::unbounded_channel();
    let def = HttpDescriptor {
        url,
        authorization: authorization.map(str::to_string),
        bearer_token_env: None,
    };
    (HttpTransport::new("web", &def, sink).unwrap(), events)
}

fn request(id: u64, params: Value) -> Frame {
    let body = json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": params});
    Frame {
        id: Some(id),
        body: serde_json::to_vec(&body).unwrap(),
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("event channel closed")
}

#[tokio::test]
async fn posts_json_with_headers_and_delivers_reply() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/echo", base), Some("Bearer s3cret"));

    transport.send(request(1, json!({"q": 1}))).await.unwrap();

    match next_event(&mut events).await {
        TransportEvent::Message(value) => {
            assert_eq!(value["id"], 1);
            assert_eq!(value["result"]["params"], json!({"q": 1}));
            assert_eq!(value["result"]["auth"], "Bearer s3cret");
            assert_eq!(value["result"]["contentType"], "application/json");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn event_stream_bodies_are_unwrapped() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/sse", base), None);

    transport.send(request(4, json!({}))).await.unwrap();

    match next_event(&mut events).await {
        TransportEvent::Message(value) => assert_eq!(value["result"]["via"], "sse"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_fails_only_that_request() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/boom", base), None);

    transport.send(request(2, json!({}))).await.unwrap();

    match next_event(&mut events).await {
        TransportEvent::Failed {
            id,
            error: TransportError::Status { status, .. },
        } => {
            assert_eq!(id, 2);
            assert_eq!(status, 500);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn unparsable_body_is_a_parse_failure() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/garbage", base), None);

    transport.send(request(3, json!({}))).await.unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Failed {
            id: 3,
            error: TransportError::Parse(_)
        }
    ));
}

#[tokio::test]
async fn reply_for_another_id_fails_the_request() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/anonymous", base), None);

    transport.send(request(5, json!({}))).await.unwrap();

    assert!(matches!(next_event(&mut events).await, TransportEvent::Message(_)));
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Failed {
            id: 5,
            error: TransportError::Parse(_)
        }
    ));
}

#[tokio::test]
async fn notifications_accept_empty_202() {
    let base = spawn_server().await;
    let (transport, _events) = transport(format!("{}/accepted", base), None);

    let body = serde_json::to_vec(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).unwrap();
    transport.send(Frame { id: None, body }).await.unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connection_failure() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (transport, mut events) = transport(format!("http://{}/mcp", addr), None);
    transport.send(request(6, json!({}))).await.unwrap();

    match next_event(&mut events).await {
        TransportEvent::Failed { id, error } => {
            assert_eq!(id, 6);
            assert_eq!(error.into_mcp("web").kind(), "connection_error");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn abandon_aborts_only_the_named_request() {
    let base = spawn_server().await;
    let (transport, mut events) = transport(format!("{}/slow", base), None);

    transport.send(request(7, json!({"delayMs": 2000}))).await.unwrap();
    transport.send(request(8, json!({"delayMs": 50}))).await.unwrap();
    transport.abandon(7);

    match next_event(&mut events).await {
        TransportEvent::Message(value) => assert_eq!(value["id"], 8),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(
        tokio::time::timeout(Duration::from_millis(300), events.recv())
            .await
            .is_err(),
        "abandoned request still produced an event"
    );
}

#[tokio::test]
async fn send_after_close_fails() {
    let base = spawn_server().await;
    let (transport, _events) = transport(format!("{}/echo", base), None);
    transport.close().await;
    assert!(matches!(
        transport.send(request(9, json!({}))).await,
        Err(TransportError::Shutdown)
    ));
}

mod body {
    use super::*;

    #[test]
    fn batch_arrays_are_split() {
        let messages = parse_body(r#"[{"id":1},{"id":2}]"#, false).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn empty_body_has_no_messages() {
        assert!(parse_body("  ", false).unwrap().is_empty());
    }

    #[test]
    fn event_stream_ignores_non_data_lines() {
        let body = "event: message\nid: 1\ndata: {\"id\":1}\n\n: comment\n";
        assert_eq!(parse_body(body, true).unwrap(), vec![json!({"id": 1})]);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 5), "hi");
    }
}
