// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::test_helpers::{entry, registry, tool, MockConnector};
use yare::parameterized;

fn settings(exec_enabled: bool) -> Settings {
    Settings {
        registry_path: "/tmp/registry.json".into(),
        exec_enabled,
        call_timeout: Duration::from_secs(5),
        describe_timeout: Duration::from_secs(5),
        exec_timeout: Duration::from_secs(5),
    }
}

fn orchestrator(connector: &MockConnector, ids: &[&str], exec_enabled: bool) -> Orchestrator {
    let pool = SessionPool::with_connector(registry(ids), Box::new(connector.clone()));
    Orchestrator::with_pool(pool, &settings(exec_enabled))
}

#[tokio::test]
async fn list_finds_provider_by_intent() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time", "weather", "fs"], false);

    let value = gateway
        .invoke(LIST_TOOL, json!({"query": "time"}))
        .await
        .unwrap();

    assert_eq!(value["servers"][0]["id"], "time");
    assert_eq!(value["servers"].as_array().unwrap().len(), 1);
    assert!(connector.connects().is_empty());
}

#[tokio::test]
async fn list_on_empty_registry_explains_where_to_add_entries() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &[], false);

    let value = gateway.invoke(LIST_TOOL, Value::Null).await.unwrap();

    assert_eq!(value["servers"], json!([]));
    let message = value["message"].as_str().unwrap();
    assert!(message.contains("/tmp/registry.json"), "{message}");
}

#[test]
fn blank_query_lists_everything() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["a", "b"], false);

    let list = gateway
        .list(ListArgs {
            query: Some("   ".into()),
            detail: Some("minimal".into()),
            ..ListArgs::default()
        })
        .unwrap();

    let ids: Vec<_> = list.servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert!(list.servers[0].summary.is_none());
}

#[parameterized(
    bad_detail = { json!({"detail": "verbose"}), "detail" },
    bad_visibility = { json!({"visibilityFilter": "secret"}), "visibilityFilter" },
    zero_limit = { json!({"limit": 0}), "limit" },
    negative_limit = { json!({"limit": -3}), "limit" },
    wrong_type = { json!({"tags": "time"}), "list_mcp_capabilities" },
)]
fn list_rejects_bad_arguments(arguments: Value, mentions: &str) {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time"], false);

    let err = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(gateway.invoke(LIST_TOOL, arguments))
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_argument");
    assert!(err.to_string().contains(mentions), "{err}");
}

#[tokio::test]
async fn describe_returns_tools_at_requested_detail() {
    let connector = MockConnector::with_tools(vec![tool("now", "Current time")]);
    let gateway = orchestrator(&connector, &["time"], false);

    let summary = gateway
        .invoke(DESCRIBE_TOOL, json!({"id": "time"}))
        .await
        .unwrap();
    assert_eq!(
        summary,
        json!({"id": "time", "tools": [{"name": "now", "description": "Current time"}]})
    );

    let schema = gateway
        .invoke(DESCRIBE_TOOL, json!({"id": "time", "detail": "schema"}))
        .await
        .unwrap();
    assert_eq!(schema["tools"][0]["inputSchema"]["type"], "object");
    assert_eq!(connector.transport("time").methods().iter().filter(|m| *m == "tools/list").count(), 1);
}

#[tokio::test]
async fn describe_requires_an_id() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time"], false);

    let err = gateway.invoke(DESCRIBE_TOOL, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_argument");
}

#[tokio::test]
async fn describe_unknown_provider_is_not_found() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time"], false);

    let err = gateway
        .invoke(DESCRIBE_TOOL, json!({"id": "nope"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn unreachable_provider_is_flagged_in_listings() {
    let connector = MockConnector::with_tools(vec![]);
    connector.fail("time", "spawn failed");
    let gateway = orchestrator(&connector, &["time"], false);

    let err = gateway
        .describe(DescribeArgs {
            id: "time".into(),
            detail: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "connection_error");

    let list = gateway.list(ListArgs::default()).unwrap();
    let reason = list.servers[0].unavailable.as_deref().unwrap();
    assert!(reason.contains("spawn failed"), "{reason}");
}

#[tokio::test]
async fn execute_is_refused_unless_enabled() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time"], false);
    assert!(!gateway.exec_enabled());

    let err = gateway
        .invoke(
            EXECUTE_TOOL,
            json!({"source": "return $call('time', 'now')", "allowedMcpIds": ["time"]}),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "execution_disabled");
    assert!(err.to_string().contains("TOOLSCOUT_ENABLE_EXEC"));
    assert!(connector.connects().is_empty());
}

#[tokio::test]
async fn execute_runs_and_serializes_output() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &["time"], true);

    let value = gateway
        .invoke(
            EXECUTE_TOOL,
            json!({
                "code": "const r = $call('time', 'now', { value: 'UTC' })\nprint(r.tool)\nreturn r.arguments.value",
                "allowedMcpIds": ["time"]
            }),
        )
        .await
        .unwrap();

    assert_eq!(value, json!({"stdout": "now\n", "result": "UTC"}));
}

#[tokio::test]
async fn zero_timeout_is_invalid() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &[], true);

    let err = gateway
        .execute(ExecuteArgs {
            source: "return 1".into(),
            timeout_ms: Some(0),
            ..ExecuteArgs::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_argument");
}

#[tokio::test]
async fn unknown_tool_is_invalid_argument() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = orchestrator(&connector, &[], true);

    let err = gateway.invoke("delete_everything", json!({})).await.unwrap_err();
    assert!(matches!(err, McpError::InvalidArgument(ref m) if m.contains("delete_everything")));
}

#[tokio::test]
async fn warm_up_caches_auto_discovered_providers() {
    let connector = MockConnector::with_tools(vec![tool("now", "")]);
    let mut eager = entry("time");
    eager.auto_discover_tools = true;
    let registry = Registry::from_entries("/tmp/registry.json", vec![eager, entry("lazy")]).unwrap();
    let pool = SessionPool::with_connector(Arc::new(registry), Box::new(connector.clone()));
    let gateway = Arc::new(Orchestrator::with_pool(pool, &settings(false)));

    gateway.warm_up().unwrap().await.unwrap();

    assert!(gateway.introspector().is_cached("time"));
    assert!(!gateway.introspector().is_cached("lazy"));
    assert_eq!(connector.connects(), vec!["time"]);
}

#[tokio::test]
async fn warm_up_survives_failures() {
    let connector = MockConnector::with_tools(vec![]);
    connector.fail("time", "no such binary");
    let mut eager = entry("time");
    eager.auto_discover_tools = true;
    let registry = Registry::from_entries("/tmp/registry.json", vec![eager]).unwrap();
    let pool = SessionPool::with_connector(Arc::new(registry), Box::new(connector.clone()));
    let gateway = Arc::new(Orchestrator::with_pool(pool, &settings(false)));

    gateway.warm_up().unwrap().await.unwrap();

    assert!(!gateway.introspector().is_cached("time"));
    assert!(gateway.list(ListArgs::default()).unwrap().servers[0]
        .unavailable
        .is_some());
}

#[test]
fn warm_up_without_eager_entries_does_nothing() {
    let connector = MockConnector::with_tools(vec![]);
    let gateway = Arc::new(orchestrator(&connector, &["time"], false));
    assert!(gateway.warm_up().is_none());
}

#[test]
fn tool_definitions_name_the_three_tools() {
    let names: Vec<_> = tool_definitions().into_iter().map(|t| t.name).collect();
    assert_eq!(names, [LIST_TOOL, DESCRIBE_TOOL, EXECUTE_TOOL]);
}
