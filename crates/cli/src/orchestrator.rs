// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The three agent-facing tools behind one owner.
//!
//! An [`Orchestrator`] owns the registry, the session pool, the
//! introspection cache and the execution engine. Nothing here is global, so
//! independent instances never share clients or caches.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::error::McpError;
use crate::exec::{ExecutionEngine, ExecutionOutput, ExecutionRequest};
use crate::introspect::{DescribeDetail, Introspector, ProviderDescription};
use crate::registry::{
    list_capabilities, CapabilityList, CapabilityQuery, Detail, Registry, VisibilityFilter,
};
use crate::rpc::ToolDescriptor;
use crate::session::SessionPool;

pub const LIST_TOOL: &str = "list_mcp_capabilities";
pub const DESCRIBE_TOOL: &str = "describe_mcp";
pub const EXECUTE_TOOL: &str = "execute_mcp_code";

/// Arguments of `list_mcp_capabilities`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub visibility_filter: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ListArgs {
    fn into_query(self) -> Result<CapabilityQuery, McpError> {
        Ok(CapabilityQuery {
            query: self.query.filter(|q| !q.trim().is_empty()),
            tags: self.tags,
            domains: self.domains,
            visibility: self
                .visibility_filter
                .as_deref()
                .map(str::parse::<VisibilityFilter>)
                .transpose()?
                .unwrap_or_default(),
            limit: self.limit,
            detail: self
                .detail
                .as_deref()
                .map(str::parse::<Detail>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Arguments of `describe_mcp`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescribeArgs {
    pub id: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Arguments of `execute_mcp_code`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteArgs {
    #[serde(alias = "code")]
    pub source: String,
    #[serde(default)]
    pub allowed_mcp_ids: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

pub struct Orchestrator {
    pool: Arc<SessionPool>,
    introspector: Introspector,
    engine: ExecutionEngine,
}

impl Orchestrator {
    /// Load the registry named by `settings` and wire everything up.
    pub fn load(settings: &Settings) -> Result<Self, McpError> {
        let registry = Registry::load(&settings.registry_path)?;
        tracing::info!(
            path = %settings.registry_path.display(),
            servers = registry.len(),
            "registry loaded"
        );
        Ok(Self::new(registry, settings))
    }

    pub fn new(registry: Registry, settings: &Settings) -> Self {
        let pool = SessionPool::new(Arc::new(registry), settings.client_options());
        Self::with_pool(pool, settings)
    }

    pub fn with_pool(pool: SessionPool, settings: &Settings) -> Self {
        let pool = Arc::new(pool);
        Self {
            introspector: Introspector::new(Arc::clone(&pool), settings.describe_timeout),
            engine: ExecutionEngine::new(
                Arc::clone(&pool),
                settings.exec_enabled,
                settings.exec_timeout,
                settings.call_timeout,
            ),
            pool,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.pool.registry()
    }

    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    pub fn exec_enabled(&self) -> bool {
        self.engine.is_enabled()
    }

    /// `list_mcp_capabilities`
    pub fn list(&self, args: ListArgs) -> Result<CapabilityList, McpError> {
        let query = args.into_query()?;
        list_capabilities(self.registry(), &query, |id| self.pool.unavailable_reason(id))
    }

    /// `describe_mcp`
    pub async fn describe(&self, args: DescribeArgs) -> Result<ProviderDescription, McpError> {
        let detail = match args.detail.as_deref() {
            Some(detail) => detail.parse()?,
            None => DescribeDetail::default(),
        };
        self.introspector.describe(&args.id, detail).await
    }

    /// `execute_mcp_code`
    pub async fn execute(&self, args: ExecuteArgs) -> Result<ExecutionOutput, McpError> {
        let timeout = match args.timeout_ms {
            Some(0) => {
                return Err(McpError::InvalidArgument(
                    "timeoutMs must be at least 1".to_string(),
                ))
            }
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };
        let allowed: BTreeSet<String> = args.allowed_mcp_ids.into_iter().collect();
        self.engine
            .execute(ExecutionRequest {
                source: args.source,
                allowed,
                timeout,
            })
            .await
    }

    /// Dispatch a tool call by name with raw JSON arguments.
    pub async fn invoke(&self, tool: &str, arguments: Value) -> Result<Value, McpError> {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        match tool {
            LIST_TOOL => to_json(self.list(from_json(tool, arguments)?)?),
            DESCRIBE_TOOL => to_json(self.describe(from_json(tool, arguments)?).await?),
            EXECUTE_TOOL => to_json(self.execute(from_json(tool, arguments)?).await?),
            other => Err(McpError::InvalidArgument(format!("unknown tool '{}'", other))),
        }
    }

    /// Describe every `autoDiscoverTools` entry in the background.
    ///
    /// Failures are logged and recorded as unavailability by the
    /// introspector; they never stop the server.
    pub fn warm_up(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let ids: Vec<String> = self
            .registry()
            .entries()
            .iter()
            .filter(|entry| entry.auto_discover_tools)
            .map(|entry| entry.id.clone())
            .collect();
        if ids.is_empty() {
            return None;
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let results =
                futures::future::join_all(ids.iter().map(|id| this.introspector.tools(id))).await;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(tools) => {
                        tracing::info!(provider = %id, tools = tools.len(), "discovered tools")
                    }
                    Err(e) => tracing::warn!(provider = %id, error = %e, "tool discovery failed"),
                }
            }
        }))
    }

    /// Close every provider session.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

fn from_json<T: serde::de::DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments)
        .map_err(|e| McpError::InvalidArgument(format!("{}: {}", tool, e)))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value)
        .map_err(|e| McpError::InvalidArgument(format!("unserializable result: {}", e)))
}

/// The tools this gateway serves, with their input schemas.
pub fn tool_definitions() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: LIST_TOOL.to_string(),
            description: Some(
                "Search the registry of MCP servers by intent. Returns matching server ids \
                 with short summaries; call describe_mcp on one to see its tools."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Free-text intent, e.g. \"convert time zones\""},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "domains": {"type": "array", "items": {"type": "string"}},
                    "visibilityFilter": {"type": "string", "enum": ["default", "hidden", "all"]},
                    "limit": {"type": "integer", "minimum": 1},
                    "detail": {"type": "string", "enum": ["minimal", "summary"]}
                }
            }),
        },
        ToolDescriptor {
            name: DESCRIBE_TOOL.to_string(),
            description: Some(
                "List the tools of one MCP server. Use detail \"schema\" to include input schemas."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "detail": {"type": "string", "enum": ["summary", "schema"]}
                },
                "required": ["id"]
            }),
        },
        ToolDescriptor {
            name: EXECUTE_TOOL.to_string(),
            description: Some(
                "Run a short JavaScript-like script that calls MCP tools with \
                 $call(serverId, toolName, args). Only servers in allowedMcpIds are reachable. \
                 Returns captured console output and the script's return value. Disabled unless \
                 TOOLSCOUT_ENABLE_EXEC is set. Not a security boundary."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "source": {"type": "string"},
                    "allowedMcpIds": {"type": "array", "items": {"type": "string"}},
                    "timeoutMs": {"type": "integer", "minimum": 1}
                },
                "required": ["source"]
            }),
        },
    ]
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
