// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 client for one MCP provider.
//!
//! The client assigns request ids, keeps a table of pending requests and
//! correlates replies delivered by the transport's event stream. Calls are
//! fully pipelined: any number may be in flight and replies may arrive in
//! any order.
//!
//! Every pending entry is removed exactly once, by whichever of these
//! happens first: the reply, the timeout, an abort, the caller dropping the
//! call future, or [`close`](RpcClient::close). Removal by anything but a
//! reply also tells the transport to abandon the request.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> Closing -> Closed
//! ```
//!
//! Transitions are one-way. A closed client is discarded, never reused.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use super::abort::AbortSignal;
use super::protocol::{
    Incoming, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    ServerInfo, ToolCallParams, ToolDescriptor, ToolsListResult, KNOWN_PROTOCOL_VERSIONS,
};
use super::transport::{self, Frame, Transport, TransportEvent};
use crate::error::McpError;
use crate::registry::RegistryEntry;

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time in-flight calls get to finish during [`RpcClient::close`].
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Upper bound on `tools/list` pages followed before giving up.
const MAX_TOOL_PAGES: usize = 100;

/// Connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    /// Awaiting the `initialize` response.
    Initializing,
    Ready,
    /// No new calls; in-flight calls drain.
    Closing,
    Closed,
}

/// Client-wide settings.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Timeout applied when a call does not set its own.
    pub call_timeout: Duration,
    /// How long `close` waits for in-flight calls.
    pub close_grace: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

/// Per-call settings.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub abort: Option<AbortSignal>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            abort: None,
        }
    }

    pub fn abort_on(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }
}

struct PendingRequest {
    method: String,
    created_at: Instant,
    responder: oneshot::Sender<Result<Value, McpError>>,
}

/// State shared between the client and its dispatcher task.
struct Shared {
    provider: String,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    state: Mutex<ClientState>,
    drained: Notify,
}

impl Shared {
    fn state(&self) -> ClientState {
        *self.state.lock()
    }

    fn set_state(&self, state: ClientState) {
        *self.state.lock() = state;
    }

    /// Remove a pending entry. The only way entries leave the table.
    fn take(&self, id: u64) -> Option<PendingRequest> {
        let mut pending = self.pending.lock();
        let entry = pending.remove(&id);
        if pending.is_empty() {
            self.drained.notify_waiters();
        }
        entry
    }

    fn resolve(&self, id: u64, outcome: Result<Value, McpError>) -> bool {
        match self.take(id) {
            Some(entry) => {
                tracing::trace!(
                    provider = %self.provider,
                    id,
                    method = %entry.method,
                    elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                    ok = outcome.is_ok(),
                    "request completed"
                );
                let _ = entry.responder.send(outcome);
                true
            }
            None => false,
        }
    }

    fn fail_all(&self, error: impl Fn() -> McpError) -> usize {
        let drained: Vec<PendingRequest> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, entry)| entry).collect()
        };
        self.drained.notify_waiters();
        let count = drained.len();
        for entry in drained {
            let _ = entry.responder.send(Err(error()));
        }
        count
    }

    fn route(&self, message: Value) {
        match Incoming::classify(message) {
            Incoming::Response { id, outcome } => {
                let outcome = outcome
                    .map_err(|e| McpError::remote(&self.provider, e.code, e.message, e.data));
                if !self.resolve(id, outcome) {
                    tracing::warn!(provider = %self.provider, id, "dropping response for unknown request id");
                }
            }
            Incoming::Notification { method } => {
                tracing::debug!(provider = %self.provider, %method, "ignoring server notification");
            }
            Incoming::Request { id, method } => {
                tracing::debug!(provider = %self.provider, %id, %method, "ignoring server request");
            }
            Incoming::Invalid(reason) => {
                tracing::warn!(provider = %self.provider, %reason, "discarding invalid JSON-RPC message");
            }
        }
    }
}

/// Removes its pending entry on drop unless disarmed, and abandons the
/// request at the transport if the entry was still there.
struct PendingGuard<'a> {
    client: &'a RpcClient,
    id: u64,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(entry) = self.client.shared.take(self.id) {
            tracing::debug!(
                provider = %self.client.shared.provider,
                id = self.id,
                method = %entry.method,
                elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                "abandoning request"
            );
            self.client.transport.abandon(self.id);
        }
    }
}

/// JSON-RPC client bound to one provider's transport.
pub struct RpcClient {
    shared: Arc<Shared>,
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
    server_info: Mutex<Option<ServerInfo>>,
    options: ClientOptions,
}

impl RpcClient {
    /// Open the entry's transport and wrap it in an uninitialized client.
    pub async fn connect(entry: &RegistryEntry, options: ClientOptions) -> Result<Self, McpError> {
        let (sink, events) = mpsc::unbounded_channel();
        let transport = transport::connect(entry, sink)
            .await
            .map_err(|e| e.into_mcp(&entry.id))?;
        Ok(Self::new(&entry.id, transport, events, options))
    }

    /// Wrap an open transport. `events` must be the receiving end of the
    /// sink the transport was built with. Must be called within a runtime.
    pub fn new(
        provider: &str,
        transport: Box<dyn Transport>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
        options: ClientOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            provider: provider.to_string(),
            pending: Mutex::new(HashMap::new()),
            state: Mutex::new(ClientState::Uninitialized),
            drained: Notify::new(),
        });
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&shared), events));

        Self {
            shared,
            transport,
            next_id: AtomicU64::new(1),
            dispatcher,
            server_info: Mutex::new(None),
            options,
        }
    }

    pub fn provider(&self) -> &str {
        &self.shared.provider
    }

    pub fn state(&self) -> ClientState {
        self.shared.state()
    }

    /// Closing or closed; the client must be replaced.
    pub fn is_closed(&self) -> bool {
        matches!(self.state(), ClientState::Closing | ClientState::Closed)
    }

    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.lock().clone()
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }

    /// Perform the MCP handshake.
    ///
    /// Sends `initialize`, then `notifications/initialized`. A failed
    /// handshake closes the client. Calling this on a ready client returns
    /// the cached server info.
    pub async fn initialize(&self) -> Result<ServerInfo, McpError> {
        let previous = {
            let mut state = self.shared.state.lock();
            let previous = *state;
            if previous == ClientState::Uninitialized {
                *state = ClientState::Initializing;
            }
            previous
        };
        match previous {
            ClientState::Uninitialized => {}
            ClientState::Ready => {
                return Ok(self.server_info().unwrap_or_else(|| self.anonymous_server()));
            }
            ClientState::Initializing => {
                return Err(McpError::protocol(
                    self.provider(),
                    "initialize already in progress",
                ))
            }
            ClientState::Closing | ClientState::Closed => {
                return Err(McpError::Closed(self.provider().to_string()))
            }
        }

        match self.handshake().await {
            Ok(info) => {
                tracing::info!(
                    provider = %self.provider(),
                    server = %info.name,
                    version = info.version.as_deref().unwrap_or("unknown"),
                    "MCP server initialized"
                );
                Ok(info)
            }
            Err(e) => {
                tracing::warn!(provider = %self.provider(), error = %e, "initialize failed");
                self.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<ServerInfo, McpError> {
        let provider = self.provider();
        let params = serde_json::to_value(InitializeParams::default())
            .map_err(|e| McpError::protocol(provider, e))?;
        let value = self
            .request("initialize", Some(params), CallOptions::default())
            .await?;
        let result: InitializeResult = serde_json::from_value(value)
            .map_err(|e| McpError::protocol(provider, format!("invalid initialize result: {}", e)))?;

        if !KNOWN_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            tracing::warn!(
                provider,
                version = %result.protocol_version,
                "MCP server answered with an unknown protocol version"
            );
        }

        let info = result
            .server_info
            .unwrap_or_else(|| self.anonymous_server());
        self.send_notification("notifications/initialized", None)
            .await?;
        *self.server_info.lock() = Some(info.clone());

        let mut state = self.shared.state.lock();
        if *state != ClientState::Initializing {
            return Err(McpError::Closed(provider.to_string()));
        }
        *state = ClientState::Ready;
        Ok(info)
    }

    fn anonymous_server(&self) -> ServerInfo {
        ServerInfo {
            name: self.provider().to_string(),
            version: None,
        }
    }

    /// Issue a request and wait for its result.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        options: CallOptions,
    ) -> Result<Value, McpError> {
        match self.state() {
            ClientState::Ready => self.request(method, params, options).await,
            ClientState::Uninitialized | ClientState::Initializing => Err(McpError::protocol(
                self.provider(),
                format!("cannot call '{}' before initialize completes", method),
            )),
            ClientState::Closing | ClientState::Closed => {
                Err(McpError::Closed(self.provider().to_string()))
            }
        }
    }

    /// Send a notification. No reply is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        match self.state() {
            ClientState::Ready => self.send_notification(method, params).await,
            ClientState::Closing | ClientState::Closed => {
                Err(McpError::Closed(self.provider().to_string()))
            }
            _ => Err(McpError::protocol(
                self.provider(),
                format!("cannot send '{}' before initialize completes", method),
            )),
        }
    }

    /// `tools/list`, following `nextCursor` until the provider stops paging.
    pub async fn list_tools(&self, options: CallOptions) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let value = self.call("tools/list", params, options.clone()).await?;
            let page: ToolsListResult = serde_json::from_value(value).map_err(|e| {
                McpError::protocol(self.provider(), format!("invalid tools/list result: {}", e))
            })?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                _ => return Ok(tools),
            }
        }

        Err(McpError::protocol(
            self.provider(),
            format!("tools/list returned more than {} pages", MAX_TOOL_PAGES),
        ))
    }

    /// `tools/call`, returning the raw result object.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        options: CallOptions,
    ) -> Result<Value, McpError> {
        let params = serde_json::to_value(ToolCallParams { name, arguments })
            .map_err(|e| McpError::protocol(self.provider(), e))?;
        self.call("tools/call", Some(params), options).await
    }

    /// Stop accepting calls, let in-flight calls drain within the grace
    /// period, then tear the transport down. Idempotent.
    pub async fn close(&self) {
        let previous = {
            let mut state = self.shared.state.lock();
            let previous = *state;
            if !matches!(previous, ClientState::Closing | ClientState::Closed) {
                *state = ClientState::Closing;
            }
            previous
        };

        match previous {
            ClientState::Closing => return,
            ClientState::Closed => {
                self.transport.close().await;
                self.dispatcher.abort();
                return;
            }
            _ => {}
        }

        if !self.wait_drained(self.options.close_grace).await {
            tracing::debug!(
                provider = %self.provider(),
                remaining = self.pending_count(),
                "grace period elapsed with requests in flight"
            );
        }
        let rejected = self
            .shared
            .fail_all(|| McpError::Closed(self.provider().to_string()));

        if previous == ClientState::Ready {
            if let Err(e) = self.send_notification("shutdown", None).await {
                tracing::debug!(provider = %self.provider(), error = %e, "shutdown notification failed");
            }
        }
        self.transport.close().await;
        self.shared.set_state(ClientState::Closed);
        self.dispatcher.abort();

        tracing::debug!(provider = %self.provider(), rejected, "client closed");
    }

    async fn wait_drained(&self, grace: Duration) -> bool {
        let drained = async {
            loop {
                let notified = self.shared.drained.notified();
                if self.shared.pending.lock().is_empty() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, drained).await.is_ok()
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        options: CallOptions,
    ) -> Result<Value, McpError> {
        let provider = self.provider();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&JsonRpcRequest::new(id, method, params))
            .map_err(|e| McpError::protocol(provider, e))?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            id,
            PendingRequest {
                method: method.to_string(),
                created_at: Instant::now(),
                responder: tx,
            },
        );
        let guard = PendingGuard {
            client: self,
            id,
            armed: true,
        };

        let timeout = options.timeout.unwrap_or(self.options.call_timeout);
        let exchange = async {
            if let Err(e) = self.transport.send(Frame { id: Some(id), body }).await {
                self.shared.take(id);
                return Err(e.into_mcp(provider));
            }
            rx.await
                .unwrap_or_else(|_| Err(McpError::Closed(provider.to_string())))
        };
        let aborted = async {
            match &options.abort {
                Some(signal) => signal.aborted().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            outcome = exchange => {
                guard.disarm();
                outcome
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(provider, id, method, timeout_ms = timeout.as_millis() as u64, "request timed out");
                Err(McpError::Timeout {
                    provider: provider.to_string(),
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            _ = aborted => {
                tracing::debug!(provider, id, method, "request cancelled");
                Err(McpError::Cancelled {
                    provider: provider.to_string(),
                    method: method.to_string(),
                })
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let provider = self.provider();
        let body = serde_json::to_vec(&JsonRpcNotification::new(method, params))
            .map_err(|e| McpError::protocol(provider, e))?;
        let timeout = self.options.call_timeout;
        match tokio::time::timeout(timeout, self.transport.send(Frame { id: None, body })).await {
            Ok(sent) => sent.map_err(|e| e.into_mcp(provider)),
            Err(_) => {
                tracing::warn!(provider, method, timeout_ms = timeout.as_millis() as u64, "notification timed out");
                Err(McpError::Timeout {
                    provider: provider.to_string(),
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("provider", &self.shared.provider)
            .field("transport", &self.transport.kind())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Route transport events until the session ends, then fail what is left.
async fn dispatch(shared: Arc<Shared>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    let reason = loop {
        let Some(event) = events.recv().await else {
            break "transport dropped".to_string();
        };
        match event {
            TransportEvent::Message(message) => shared.route(message),
            TransportEvent::Failed { id, error } => {
                let error = error.into_mcp(&shared.provider);
                if !shared.resolve(id, Err(error)) {
                    tracing::debug!(provider = %shared.provider, id, "failure for request no longer pending");
                }
            }
            TransportEvent::Malformed { line, error } => {
                let preview: String = line.chars().take(200).collect();
                tracing::warn!(provider = %shared.provider, %error, line = %preview, "discarding malformed line");
            }
            TransportEvent::Closed { reason } => break reason,
        }
    };

    let previous = shared.state();
    shared.set_state(ClientState::Closed);
    if !matches!(previous, ClientState::Closing | ClientState::Closed) {
        tracing::info!(provider = %shared.provider, %reason, "MCP server session ended");
    }
    let failed = shared.fail_all(|| {
        McpError::connection(&shared.provider, format!("session ended: {}", reason))
    });
    if failed > 0 {
        tracing::debug!(provider = %shared.provider, failed, "failed in-flight requests");
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
