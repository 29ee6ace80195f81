// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! End-to-end tests driving the `toolscout` binary.

use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn write_registry(entries: Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(entries.to_string().as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn clock_registry() -> NamedTempFile {
    write_registry(json!([
        {
            "id": "time",
            "title": "Clock",
            "summary": "Convert and report time across zones",
            "tags": ["time", "timezone"],
            "domains": ["utilities"],
            "transport": {
                "kind": "stdio",
                "command": "python3",
                "args": [fixture("clock_server.py")]
            }
        },
        {
            "id": "weather",
            "title": "Weather",
            "summary": "Forecasts by city",
            "domains": ["travel"],
            "transport": {"kind": "http", "url": "http://127.0.0.1:9/mcp"}
        }
    ]))
}

fn toolscout(registry: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("toolscout").unwrap();
    cmd.env_remove("TOOLSCOUT_ENABLE_EXEC")
        .env_remove("TOOLSCOUT_LOG")
        .arg("--registry")
        .arg(registry.path());
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn list_finds_clock_by_intent() {
    let registry = clock_registry();
    let output = toolscout(&registry)
        .args(["list", "time"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let value = stdout_json(&output);
    assert_eq!(value["servers"].as_array().unwrap().len(), 1);
    assert_eq!(value["servers"][0]["id"], "time");
}

#[test]
fn list_filters_by_domain() {
    let registry = clock_registry();
    let output = toolscout(&registry)
        .args(["list", "--domain", "travel", "--detail", "minimal"])
        .output()
        .unwrap();

    assert_eq!(
        stdout_json(&output),
        json!({"servers": [{"id": "weather", "title": "Weather"}]})
    );
}

#[test]
fn missing_registry_lists_nothing_and_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    Command::cargo_bin("toolscout")
        .unwrap()
        .arg("--registry")
        .arg(&path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"servers\": []"))
        .stdout(predicate::str::contains(path.display().to_string()));
}

#[test]
fn malformed_registry_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[{\"id\": \"x\"}]").unwrap();
    toolscout(&file)
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config_error"));
}

/// Tool errors exit 1 with the error kind on stderr.
#[rstest]
#[case(&["list", "--limit", "0"], "invalid_argument")]
#[case(&["list", "--visibility", "secret"], "invalid_argument")]
#[case(&["describe", "nope"], "not_found")]
#[case(&["describe", "time", "--detail", "full"], "invalid_argument")]
#[case(&["exec", "-e", "return 1", "--allow", "time"], "TOOLSCOUT_ENABLE_EXEC")]
#[case(&["--enable-exec", "exec", "-e", "return ("], "script_error")]
fn tool_errors_exit_with_kind(#[case] args: &[&str], #[case] expected: &str) {
    let registry = clock_registry();
    toolscout(&registry)
        .args(args)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(expected));
}

#[test]
fn describe_lists_tools_of_stdio_server() {
    let registry = clock_registry();
    let output = toolscout(&registry)
        .args(["describe", "time", "--detail", "schema"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let value = stdout_json(&output);
    assert_eq!(value["id"], "time");
    assert_eq!(value["tools"][0]["name"], "now");
    assert_eq!(
        value["tools"][0]["inputSchema"]["properties"]["zone"]["type"],
        "string"
    );
}

#[test]
fn exec_calls_the_allowed_server() {
    let registry = clock_registry();
    let output = toolscout(&registry)
        .env("TOOLSCOUT_ENABLE_EXEC", "1")
        .args(["exec", "--allow", "time", "-"])
        .write_stdin("const r = await $call('time', 'now', { zone: 'Europe/Paris' })\nconsole.log(r.zone)\nreturn r.time")
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        stdout_json(&output),
        json!({"stdout": "Europe/Paris\n", "result": "12:00"})
    );
}

#[test]
fn exec_refuses_servers_outside_the_allow_list() {
    let registry = clock_registry();
    toolscout(&registry)
        .arg("--enable-exec")
        .args(["exec", "-e", "return $call('time', 'now')"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_allowed"));
}

#[test]
fn serve_answers_the_mcp_handshake() {
    let registry = clock_registry();
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "list_mcp_capabilities", "arguments": {"query": "weather"}}}),
    ]
    .iter()
    .map(|m| format!("{m}\n"))
    .collect::<String>();

    let output = toolscout(&registry)
        .arg("serve")
        .write_stdin(input)
        .output()
        .unwrap();

    assert!(output.status.success(), "{output:?}");
    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    let listing = responses.iter().find(|r| r["id"] == 2).unwrap();
    assert_eq!(
        listing["result"]["structuredContent"]["servers"][0]["id"],
        "weather"
    );
}
