// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles: a scripted in-memory transport, a scripted MCP provider,
//! and a connector that hands out clients over them.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};

use crate::rpc::transport::{EventSink, Frame, Transport, TransportError, TransportEvent};

type Responder = Box<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Shared view of a [`MockTransport`], kept by the test.
pub(crate) struct MockState {
    sink: EventSink,
    sent: parking_lot::Mutex<Vec<Value>>,
    abandoned: parking_lot::Mutex<Vec<u64>>,
    closed: AtomicBool,
    activity: Notify,
    responder: parking_lot::Mutex<Option<Responder>>,
    stall: parking_lot::Mutex<Option<Box<dyn Fn(&Value) -> bool + Send + Sync>>>,
}

impl MockState {
    /// Never finish sending frames matching `f`, like a peer that stopped reading.
    pub fn stall_when(&self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) {
        *self.stall.lock() = Some(Box::new(f));
    }

    /// Answer every frame with `f`; `None` means stay silent.
    pub fn respond_with(&self, f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) {
        *self.responder.lock() = Some(Box::new(f));
    }

    /// Push an inbound message as if the provider wrote it.
    pub fn reply(&self, message: Value) {
        let _ = self.sink.send(TransportEvent::Message(message));
    }

    /// Push an arbitrary event.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.sink.send(event);
    }

    /// Every frame sent so far.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// Frames with an id, i.e. requests.
    pub fn requests(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.get("id").is_some())
            .cloned()
            .collect()
    }

    /// Method names of every frame sent so far.
    pub fn methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| m["method"].as_str().map(str::to_string))
            .collect()
    }

    pub fn abandoned(&self) -> Vec<u64> {
        self.abandoned.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until at least `n` requests were sent.
    pub async fn wait_for_requests(&self, n: usize) {
        loop {
            let notified = self.activity.notified();
            if self.requests().len() >= n {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) struct MockTransport {
    state: Arc<MockState>,
}

/// Build a mock transport plus the receiver an `RpcClient` consumes.
pub(crate) fn mock() -> (
    MockTransport,
    Arc<MockState>,
    mpsc::UnboundedReceiver<TransportEvent>,
) {
    let (sink, events) = mpsc::unbounded_channel();
    let state = Arc::new(MockState {
        sink,
        sent: parking_lot::Mutex::new(Vec::new()),
        abandoned: parking_lot::Mutex::new(Vec::new()),
        closed: AtomicBool::new(false),
        activity: Notify::new(),
        responder: parking_lot::Mutex::new(None),
        stall: parking_lot::Mutex::new(None),
    });
    (
        MockTransport {
            state: Arc::clone(&state),
        },
        state,
        events,
    )
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.state.is_closed() {
            return Err(TransportError::Shutdown);
        }
        let message: Value = serde_json::from_slice(&frame.body).unwrap();
        assert_eq!(message.get("id").and_then(Value::as_u64), frame.id);
        self.state.sent.lock().push(message.clone());
        let stalled = self.state.stall.lock().as_ref().is_some_and(|f| f(&message));
        if stalled {
            std::future::pending::<()>().await;
        }

        let reply = self
            .state
            .responder
            .lock()
            .as_ref()
            .and_then(|respond| respond(&message));
        if let Some(reply) = reply {
            self.state.reply(reply);
        }
        self.state.activity.notify_waiters();
        Ok(())
    }

    fn abandon(&self, id: u64) {
        self.state.abandoned.lock().push(id);
    }

    async fn close(&self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

/// A well-behaved MCP provider exposing `tools`.
///
/// `tools/call` echoes `{"tool": name, "arguments": args}` as text content,
/// except for a tool named `fail`, which answers with error -32001.
pub(crate) fn mcp_provider(tools: Vec<Value>) -> impl Fn(&Value) -> Option<Value> + Send + Sync {
    move |message| {
        let id = message.get("id")?.clone();
        let method = message["method"].as_str().unwrap_or_default();
        let result = match method {
            "initialize" => json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mock", "version": "1.0.0"}
            }),
            "tools/list" => json!({"tools": tools}),
            "tools/call" => {
                let name = message["params"]["name"].as_str().unwrap_or_default();
                if name == "fail" {
                    return Some(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32001, "message": "tool failed", "data": {"tool": name}}
                    }));
                }
                let text = json!({"tool": name, "arguments": message["params"]["arguments"]});
                json!({"content": [{"type": "text", "text": text.to_string()}], "isError": false})
            }
            _ => {
                return Some(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("Method not found: {}", method)}
                }))
            }
        };
        Some(json!({"jsonrpc": "2.0", "id": id, "result": result}))
    }
}

type ProviderFn = dyn Fn(&str, &Value) -> Option<Value> + Send + Sync;

/// Hands out initialized clients over [`MockTransport`]s.
///
/// Every provider is answered by one scripted function taking the provider
/// id and the inbound message. Clones share state, so a test can keep one
/// while the pool owns another.
#[derive(Clone)]
pub(crate) struct MockConnector {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    provider: Box<ProviderFn>,
    options: crate::rpc::ClientOptions,
    connects: parking_lot::Mutex<Vec<String>>,
    failing: parking_lot::Mutex<std::collections::HashMap<String, String>>,
    transports: parking_lot::Mutex<std::collections::HashMap<String, Arc<MockState>>>,
}

impl MockConnector {
    pub fn new(provider: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                provider: Box::new(provider),
                options: crate::rpc::ClientOptions {
                    call_timeout: std::time::Duration::from_secs(5),
                    close_grace: std::time::Duration::from_millis(100),
                },
                connects: parking_lot::Mutex::new(Vec::new()),
                failing: parking_lot::Mutex::new(Default::default()),
                transports: parking_lot::Mutex::new(Default::default()),
            }),
        }
    }

    /// Every provider serves the same tool list through [`mcp_provider`].
    pub fn with_tools(tools: Vec<Value>) -> Self {
        let provider = mcp_provider(tools);
        Self::new(move |_, message| provider(message))
    }

    /// Make connections to `id` fail until [`recover`](Self::recover).
    pub fn fail(&self, id: &str, reason: &str) {
        self.inner
            .failing
            .lock()
            .insert(id.to_string(), reason.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.inner.failing.lock().remove(id);
    }

    /// Provider ids in connection order, failures included.
    pub fn connects(&self) -> Vec<String> {
        self.inner.connects.lock().clone()
    }

    /// The transport behind the most recent client for `id`.
    pub fn transport(&self, id: &str) -> Arc<MockState> {
        Arc::clone(&self.inner.transports.lock()[id])
    }
}

#[async_trait]
impl crate::session::Connector for MockConnector {
    async fn connect(
        &self,
        entry: &crate::registry::RegistryEntry,
    ) -> Result<crate::rpc::RpcClient, crate::error::McpError> {
        self.inner.connects.lock().push(entry.id.clone());
        let failure = self.inner.failing.lock().get(&entry.id).cloned();
        if let Some(reason) = failure {
            return Err(crate::error::McpError::connection(&entry.id, reason));
        }

        let (transport, state, events) = mock();
        let inner = Arc::clone(&self.inner);
        let id = entry.id.clone();
        state.respond_with(move |message| (inner.provider)(&id, message));
        self.inner
            .transports
            .lock()
            .insert(entry.id.clone(), Arc::clone(&state));

        let client = crate::rpc::RpcClient::new(
            &entry.id,
            Box::new(transport),
            events,
            self.inner.options.clone(),
        );
        client.initialize().await?;
        Ok(client)
    }
}

/// Tool descriptor JSON as a provider would list it.
pub(crate) fn tool(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {"type": "object", "properties": {"value": {"type": "string"}}}
    })
}

/// Minimal stdio registry entry.
pub(crate) fn entry(id: &str) -> crate::registry::RegistryEntry {
    crate::registry::RegistryEntry {
        id: id.into(),
        title: id.to_uppercase(),
        summary: String::new(),
        transport: crate::registry::TransportDescriptor::Stdio(crate::registry::StdioDescriptor {
            command: "true".into(),
            ..Default::default()
        }),
        domains: Vec::new(),
        tags: Vec::new(),
        examples: Vec::new(),
        sensitivity: crate::registry::Sensitivity::Low,
        visibility: crate::registry::Visibility::Default,
        priority: 0,
        auto_discover_tools: false,
    }
}

/// Registry of minimal entries with the given ids.
pub(crate) fn registry(ids: &[&str]) -> Arc<crate::registry::Registry> {
    let entries = ids.iter().map(|id| entry(id)).collect();
    Arc::new(crate::registry::Registry::from_entries("/tmp/registry.json", entries).unwrap())
}
