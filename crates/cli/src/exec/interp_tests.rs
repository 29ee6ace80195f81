// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::exec::parse;
use serde_json::json;
use yare::parameterized;

/// Answers every call with its own inputs as JSON text content.
#[derive(Default)]
struct EchoBridge {
    calls: parking_lot::Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl CallBridge for EchoBridge {
    async fn call(&self, provider: &str, tool: &str, arguments: Value) -> Result<Value, McpError> {
        self.calls
            .lock()
            .push((provider.to_string(), tool.to_string(), arguments.clone()));
        match tool {
            "broken" => Ok(json!({"content": [{"type": "text", "text": "disk full"}], "isError": true})),
            "remote" => Err(McpError::remote(provider, -32601, "Method not found".into(), None)),
            "plain" => Ok(json!({"content": [{"type": "text", "text": "hello"}]})),
            _ => {
                let text = json!({"provider": provider, "tool": tool, "args": arguments}).to_string();
                Ok(json!({"content": [{"type": "text", "text": text}]}))
            }
        }
    }
}

async fn run_with(bridge: &EchoBridge, source: &str) -> Result<Outcome, McpError> {
    let program = parse(source)?;
    Interpreter::new(bridge).run(&program).await
}

async fn run(source: &str) -> Result<Outcome, McpError> {
    run_with(&EchoBridge::default(), source).await
}

async fn result(source: &str) -> Value {
    run(source).await.unwrap().result
}

fn script_error(err: McpError) -> ScriptError {
    match err {
        McpError::Script(e) => e,
        other => panic!("expected a script error, got {other:?}"),
    }
}

#[parameterized(
    precedence = { "return 1 + 2 * 3", json!(7) },
    grouping = { "return (1 + 2) * 3", json!(9) },
    division = { "return 7 / 2", json!(3.5) },
    remainder = { "return 7 % 4", json!(3) },
    negation = { "return -(2 - 5)", json!(3) },
    string_concat = { "return 'n=' + 4", json!("n=4") },
    strict_equality = { "return 1 === 1.0 && '1' !== 1", json!(true) },
    loose_equality = { "return '1' == 1 && null == undefined", json!(true) },
    comparison = { "return 'apple' < 'banana' && 2 >= 2", json!(true) },
    ternary = { "return 3 > 2 ? 'yes' : 'no'", json!("yes") },
    or_default = { "return '' || 'fallback'", json!("fallback") },
    nullish = { "return 0 ?? 5", json!(0) },
    not = { "return !0", json!(true) },
    typeof_string = { "return typeof 'x'", json!("string") },
    division_by_zero = { "return 1 / 0", json!(null) },
)]
fn evaluates_expressions(source: &str, expected: Value) {
    let value = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(result(source));
    assert_eq!(value, expected);
}

#[tokio::test]
async fn program_without_return_yields_null() {
    assert_eq!(result("const a = 1").await, Value::Null);
}

#[tokio::test]
async fn template_literals_interpolate() {
    assert_eq!(
        result("const user = { name: 'ada', langs: ['en', 'fr'] }\nreturn `${user.name}: ${user.langs}`").await,
        json!("ada: en,fr")
    );
}

#[tokio::test]
async fn for_of_accumulates() {
    let source = r#"
        let total = 0
        const seen = []
        for (const n of [1, 2, 3, 4]) {
            if (n % 2 === 0) {
                total += n
            } else {
                seen.push(n)
            }
        }
        return { total, seen, count: seen.length }
    "#;
    assert_eq!(result(source).await, json!({"total": 6, "seen": [1, 3], "count": 2}));
}

#[tokio::test]
async fn return_inside_loop_stops_the_program() {
    let source = "for (const c of 'abc') { if (c === 'b') return c }\nreturn 'none'";
    assert_eq!(result(source).await, json!("b"));
}

#[tokio::test]
async fn nested_assignment_creates_fields_and_slots() {
    let source = r#"
        const o = { a: { b: 1 } }
        o.a.b = 5
        o["list"] = []
        o.list.push("x", "y")
        o.list[3] = "z"
        return o
    "#;
    assert_eq!(
        result(source).await,
        json!({"a": {"b": 5}, "list": ["x", "y", null, "z"]})
    );
}

#[tokio::test]
async fn block_scopes_shadow_and_restore() {
    let source = "let x = 1\n{ let x = 2 }\nif (true) { const x = 3 }\nreturn x";
    assert_eq!(result(source).await, json!(1));
}

#[tokio::test]
async fn builtins_cover_json_and_object() {
    let source = r#"
        const parsed = JSON.parse('{"b": 2, "a": [1]}')
        return {
            keys: Object.keys(parsed),
            compact: JSON.stringify(parsed.a),
            pretty: JSON.stringify({ k: 1 }, null, 2),
            isArray: Array.isArray(parsed.a),
            max: Math.max(3, 9, 4),
        }
    "#;
    let value = result(source).await;
    assert_eq!(value["keys"], json!(["b", "a"]));
    assert_eq!(value["compact"], json!("[1]"));
    assert_eq!(value["pretty"], json!("{\n  \"k\": 1\n}"));
    assert_eq!(value["isArray"], json!(true));
    assert_eq!(value["max"], json!(9));
}

#[tokio::test]
async fn object_helpers_keep_insertion_order() {
    let source = r#"
        const o = { zeta: 1, alpha: 2 }
        o.mid = 3
        return [Object.keys(o), Object.values(o), Object.entries(o)[2], JSON.stringify(o)]
    "#;
    assert_eq!(
        result(source).await,
        json!([
            ["zeta", "alpha", "mid"],
            [1, 2, 3],
            ["mid", 3],
            "{\"zeta\":1,\"alpha\":2,\"mid\":3}"
        ])
    );
}

#[tokio::test]
async fn string_and_array_methods() {
    let source = r#"
        const words = " Alpha,beta ".trim().split(",")
        return [words.join("+"), words.includes("beta"), "Alpha".toUpperCase(), words.slice(-1), "abc".length]
    "#;
    assert_eq!(
        result(source).await,
        json!(["Alpha+beta", true, "ALPHA", ["beta"], 3])
    );
}

#[tokio::test]
async fn console_output_is_captured() {
    let outcome = run("console.log('count', 2, { a: [1] })\nprint(null, true)\nreturn 1")
        .await
        .unwrap();
    assert_eq!(outcome.stdout, "count 2 {\"a\":[1]}\nnull true\n");
    assert_eq!(outcome.result, json!(1));
}

#[tokio::test]
async fn stdout_is_capped_with_marker() {
    let source = r#"
        let line = "0123456789"
        for (const i of "0123") line = line + line + line + line
        for (const c of "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz") console.log(line)
        return "done"
    "#;
    let outcome = run(source).await.unwrap();
    assert!(outcome.stdout.ends_with(TRUNCATION_MARKER));
    assert!(outcome.stdout.len() <= STDOUT_LIMIT + TRUNCATION_MARKER.len());
    assert_eq!(outcome.result, json!("done"));
}

#[tokio::test]
async fn call_unwraps_json_text_content() {
    let bridge = EchoBridge::default();
    let outcome = run_with(
        &bridge,
        "const r = await $call('time', 'now', { zone: 'UTC' })\nreturn r.args.zone",
    )
    .await
    .unwrap();

    assert_eq!(outcome.result, json!("UTC"));
    assert_eq!(
        bridge.calls.lock().clone(),
        vec![("time".to_string(), "now".to_string(), json!({"zone": "UTC"}))]
    );
}

#[tokio::test]
async fn call_without_arguments_sends_empty_object() {
    let bridge = EchoBridge::default();
    run_with(&bridge, "$call('time', 'now')").await.unwrap();
    assert_eq!(bridge.calls.lock()[0].2, json!({}));
}

#[tokio::test]
async fn call_returns_plain_text_as_string() {
    assert_eq!(result("return $call('a', 'plain')").await, json!("hello"));
}

#[tokio::test]
async fn tool_error_results_fail_the_script() {
    let err = script_error(run("\n$call('fs', 'broken')").await.unwrap_err());
    assert_eq!(err.line, 2);
    assert!(err.message.contains("disk full"), "{}", err.message);
}

#[tokio::test]
async fn bridge_errors_pass_through_unchanged() {
    let err = run("$call('time', 'remote')").await.unwrap_err();
    assert!(matches!(err, McpError::RemoteTool { code: -32601, .. }), "{err:?}");
}

#[parameterized(
    undefined_variable = { "let a = 1\nreturn b", 2, "b is not defined" },
    const_reassignment = { "const a = 1\na = 2", 2, "assignment to constant variable 'a'" },
    redeclaration = { "let a = 1\nlet a = 2", 2, "already been declared" },
    null_member = { "const a = null\n\nreturn a.b", 3, "cannot read properties of null" },
    not_iterable = { "for (const x of 5) {}", 1, "number is not iterable" },
    not_a_function = { "foo()", 1, "foo is not a function" },
    unknown_method = { "[1].frobnicate()", 1, "is not a function" },
    bad_call_args = { "$call(1)", 1, "$call expects" },
    bad_json = { "JSON.parse('{')", 1, "JSON.parse" },
    huge_array_index = { "let a = []\na[9007199254740991] = 1", 2, "array index 9007199254740991 is out of range" },
    array_index_past_limit = { "let a = [0]\na[1048577] = 1", 2, "is out of range" },
)]
fn runtime_errors_carry_line_numbers(source: &str, line: usize, message: &str) {
    let err = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(run(source))
        .unwrap_err();
    let err = script_error(err);
    assert_eq!(err.line, line, "{err}");
    assert!(err.message.contains(message), "{}", err.message);
}

#[tokio::test]
async fn optional_chaining_short_circuits_on_null() {
    assert_eq!(result("const a = null\nreturn a?.b").await, Value::Null);
}

#[parameterized(
    structured = { json!({"content": [], "structuredContent": {"k": 1}}), json!({"k": 1}) },
    json_text = { json!({"content": [{"type": "text", "text": "[1,2]"}]}), json!([1, 2]) },
    joined_text = { json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}), json!("a\nb") },
    image = { json!({"content": [{"type": "image", "data": "…"}]}), json!({"content": [{"type": "image", "data": "…"}]}) },
)]
fn unwraps_tool_payloads(raw: Value, expected: Value) {
    assert_eq!(tool_payload(raw).unwrap(), expected);
}

#[test]
fn error_payload_without_text_has_generic_message() {
    assert_eq!(
        tool_payload(json!({"content": [], "isError": true})).unwrap_err(),
        "tool reported an error"
    );
}
