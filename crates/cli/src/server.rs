// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-facing MCP server over line-delimited JSON-RPC.
//!
//! One JSON message per line in, one per line out. Requests are served
//! concurrently, so responses may come back in a different order than the
//! requests arrived. Stdout carries protocol traffic only; logs go to stderr.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::McpError;
use crate::orchestrator::{
    tool_definitions, Orchestrator, DESCRIBE_TOOL, EXECUTE_TOOL, LIST_TOOL,
};
use crate::rpc::protocol::{
    JsonRpcError, ToolCallResult, KNOWN_PROTOCOL_VERSIONS, PROTOCOL_VERSION,
};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// What the read loop should do after a message.
enum Flow {
    Continue,
    Stop,
}

pub struct AgentServer {
    orchestrator: Arc<Orchestrator>,
}

impl AgentServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Serve until `reader` reaches EOF or a `shutdown` request arrives.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let mut line = message.to_string();
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = BufReader::new(reader).lines();
        let mut in_flight = JoinSet::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let flow = self.dispatch(&line, &tx, &mut in_flight);
            reap_finished(&mut in_flight);
            if let Flow::Stop = flow {
                break;
            }
        }

        while in_flight.join_next().await.is_some() {}
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }

    fn dispatch(
        self: &Arc<Self>,
        line: &str,
        tx: &mpsc::UnboundedSender<Value>,
        in_flight: &mut JoinSet<()>,
    ) -> Flow {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                let response = error_response(Value::Null, PARSE_ERROR, format!("parse error: {}", e));
                let _ = tx.send(response);
                return Flow::Continue;
            }
        };

        let Some(method) = message.get("method").and_then(Value::as_str).map(str::to_string) else {
            let id = message.get("id").cloned().unwrap_or(Value::Null);
            let _ = tx.send(error_response(id, INVALID_REQUEST, "missing method".to_string()));
            return Flow::Continue;
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        let Some(id) = message.get("id").filter(|id| !id.is_null()).cloned() else {
            tracing::debug!(method = %method, "notification");
            return Flow::Continue;
        };

        if method == "shutdown" {
            let _ = tx.send(result_response(id, json!({})));
            return Flow::Stop;
        }

        let this = Arc::clone(self);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = match this.handle(&method, params).await {
                Ok(result) => result_response(id, result),
                Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
            };
            let _ = tx.send(response);
        });
        Flow::Continue
    }

    /// Answer one request.
    pub async fn handle(&self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", other),
                data: None,
            }),
        }
    }

    async fn call_tool(&self, params: Value) -> Result<Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_params("tools/call requires a tool name"))?;
        if ![LIST_TOOL, DESCRIBE_TOOL, EXECUTE_TOOL].contains(&name) {
            return Err(invalid_params(&format!("unknown tool '{}'", name)));
        }
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        tracing::debug!(tool = name, "tool call");
        let result = match self.orchestrator.invoke(name, arguments).await {
            Ok(value) => success(value),
            Err(e) => {
                tracing::info!(tool = name, kind = e.kind(), error = %e, "tool call failed");
                failure(&e)
            }
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError {
            code: INTERNAL_ERROR,
            message: format!("unserializable result: {}", e),
            data: None,
        })
    }
}

/// Drop the bookkeeping of requests that already answered.
fn reap_finished(in_flight: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(joined) = in_flight.try_join_next() {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "request task failed");
        }
        reaped += 1;
    }
    reaped
}

fn initialize_result(params: &Value) -> Value {
    let requested = params.get("protocolVersion").and_then(Value::as_str);
    let version = requested
        .filter(|v| KNOWN_PROTOCOL_VERSIONS.contains(v))
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": "toolscout", "version": env!("CARGO_PKG_VERSION")}
    })
}

fn success(value: Value) -> ToolCallResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    let result = ToolCallResult::success(text);
    match value {
        Value::Object(_) => result.with_structured(value),
        _ => result,
    }
}

/// Remote JSON-RPC errors keep their code, class and data.
fn failure(error: &McpError) -> ToolCallResult {
    let mut detail = json!({"kind": error.kind(), "message": error.to_string()});
    if let McpError::RemoteTool {
        provider,
        code,
        kind,
        data,
        ..
    } = error
    {
        detail["provider"] = json!(provider);
        detail["code"] = json!(code);
        detail["rpcKind"] = json!(kind.as_str());
        detail["data"] = data.clone().unwrap_or(Value::Null);
    }
    ToolCallResult::failure(error.to_string()).with_structured(json!({ "error": detail }))
}

fn invalid_params(message: &str) -> JsonRpcError {
    JsonRpcError {
        code: INVALID_PARAMS,
        message: message.to_string(),
        data: None,
    }
}

fn result_response(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
