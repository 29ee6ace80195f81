// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Stateless HTTP transport: one POST per JSON-RPC frame.
//!
//! Each request frame is posted from its own task so that calls pipeline
//! and a single request can be aborted without touching the others. The
//! reply body is either one JSON message, a batch array, or a
//! `text/event-stream` whose `data:` lines carry messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{EventSink, Frame, Transport, TransportError, TransportEvent};
use crate::registry::HttpDescriptor;

type InFlight = Arc<parking_lot::Mutex<HashMap<u64, JoinHandle<()>>>>;

pub struct HttpTransport {
    provider: String,
    client: reqwest::Client,
    url: reqwest::Url,
    sink: EventSink,
    in_flight: InFlight,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(
        provider: &str,
        def: &HttpDescriptor,
        sink: EventSink,
    ) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(&def.url)
            .map_err(|e| TransportError::Http(format!("invalid url {}: {}", def.url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        if let Some(auth) = def.authorization_header() {
            let mut value = HeaderValue::from_str(&auth)
                .map_err(|e| TransportError::Http(format!("invalid authorization header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        tracing::info!(provider = %provider, url = %url, "using HTTP MCP server");

        Ok(Self {
            provider: provider.to_string(),
            client,
            url,
            sink,
            in_flight: Arc::new(parking_lot::Mutex::new(HashMap::new())),
            closed: AtomicBool::new(false),
        })
    }

    async fn post(
        client: &reqwest::Client,
        url: reqwest::Url,
        body: Vec<u8>,
    ) -> Result<Vec<Value>, TransportError> {
        let response = client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(&text, 200),
            });
        }

        parse_body(&text, is_event_stream)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }

        let Some(id) = frame.id else {
            // Notifications: 202 or an empty body is the expected answer.
            let messages = Self::post(&self.client, self.url.clone(), frame.body).await?;
            for message in messages {
                let _ = self.sink.send(TransportEvent::Message(message));
            }
            return Ok(());
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let sink = self.sink.clone();
        let in_flight = Arc::clone(&self.in_flight);

        // Hold the lock across spawn so the task's own removal cannot run
        // before its handle is registered.
        {
            let mut guard = self.in_flight.lock();
            let handle = tokio::spawn(async move {
                let outcome = Self::post(&client, url, frame.body).await;
                in_flight.lock().remove(&id);
                match outcome {
                    Ok(messages) if messages.is_empty() => {
                        let _ = sink.send(TransportEvent::Failed {
                            id,
                            error: TransportError::Parse("empty response body".into()),
                        });
                    }
                    Ok(messages) => {
                        let answered = messages.iter().any(|m| answers(m, id));
                        for message in messages {
                            let _ = sink.send(TransportEvent::Message(message));
                        }
                        if !answered {
                            let _ = sink.send(TransportEvent::Failed {
                                id,
                                error: TransportError::Parse(format!(
                                    "response body does not answer request {}",
                                    id
                                )),
                            });
                        }
                    }
                    Err(error) => {
                        let _ = sink.send(TransportEvent::Failed { id, error });
                    }
                }
            });
            guard.insert(id, handle);
        }
        Ok(())
    }

    fn abandon(&self, id: u64) {
        if let Some(handle) = self.in_flight.lock().remove(&id) {
            tracing::debug!(provider = %self.provider, id, "aborting HTTP request");
            handle.abort();
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let handles: Vec<_> = self.in_flight.lock().drain().collect();
        for (_, handle) in handles {
            handle.abort();
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        for (_, handle) in self.in_flight.lock().drain() {
            handle.abort();
        }
    }
}

/// Split a response body into JSON messages.
fn parse_body(text: &str, is_event_stream: bool) -> Result<Vec<Value>, TransportError> {
    if is_event_stream {
        return text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .map(|data| {
                serde_json::from_str(data).map_err(|e| TransportError::Parse(e.to_string()))
            })
            .collect();
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str(text) {
        Ok(Value::Array(batch)) => Ok(batch),
        Ok(value) => Ok(vec![value]),
        Err(e) => Err(TransportError::Parse(format!(
            "{} in body {:?}",
            e,
            truncate(text, 120)
        ))),
    }
}

/// Whether a message carries the reply for request `id`.
fn answers(message: &Value, id: u64) -> bool {
    match message.get("id") {
        Some(Value::Number(n)) => n.as_u64() == Some(id),
        Some(Value::String(s)) => s.parse::<u64>().ok() == Some(id),
        _ => false,
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
