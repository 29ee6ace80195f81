// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tree-walking evaluator for parsed scripts.
//!
//! Values are plain JSON values; `undefined` and `null` are the same value.
//! The only way out of the interpreter is [`CallBridge`], reached through
//! the `$call(providerId, toolName, args)` builtin. There is no filesystem,
//! network, process, or clock access.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Number, Value};

use super::parser::{BinaryOp, Expr, ExprKind, LogicalOp, Program, Stmt, TemplateSegment, UnaryOp};
use super::ScriptError;
use crate::error::McpError;

/// Captured output cap in bytes.
pub const STDOUT_LIMIT: usize = 64 * 1024;

/// Appended once when output is cut off.
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// Statements between cooperative yields, so an enclosing timeout can fire
/// even in loops that never call out.
const YIELD_EVERY: u32 = 1024;

/// Highest array slot an assignment may create.
pub const MAX_ARRAY_INDEX: usize = 1 << 20;

/// The capability-scoped bridge from scripts to providers.
#[async_trait]
pub trait CallBridge: Send + Sync {
    /// Invoke `tool` on `provider` and return the raw `tools/call` result.
    async fn call(&self, provider: &str, tool: &str, arguments: Value) -> Result<Value, McpError>;
}

/// What a finished script produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub stdout: String,
    pub result: Value,
}

struct Binding {
    value: Value,
    constant: bool,
}

enum Flow {
    Normal,
    Return(Value),
}

#[derive(Debug, Clone)]
enum Key {
    Field(String),
    Index(usize),
}

/// An assignable location: a variable plus a path into it.
struct Place {
    root: String,
    path: Vec<Key>,
}

#[derive(Default)]
struct Stdout {
    buf: String,
    truncated: bool,
}

impl Stdout {
    fn write_line(&mut self, line: &str) {
        if self.truncated {
            return;
        }
        let room = STDOUT_LIMIT.saturating_sub(self.buf.len());
        if line.len() < room {
            self.buf.push_str(line);
            self.buf.push('\n');
            return;
        }
        let mut cut = room;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&line[..cut]);
        self.buf.push_str(TRUNCATION_MARKER);
        self.truncated = true;
    }
}

pub struct Interpreter<'a> {
    bridge: &'a dyn CallBridge,
    scopes: Vec<HashMap<String, Binding>>,
    stdout: Stdout,
    steps: u32,
}

impl<'a> Interpreter<'a> {
    pub fn new(bridge: &'a dyn CallBridge) -> Self {
        Self {
            bridge,
            scopes: vec![HashMap::new()],
            stdout: Stdout::default(),
            steps: 0,
        }
    }

    /// Run `program` to completion.
    pub async fn run(mut self, program: &Program) -> Result<Outcome, McpError> {
        let result = match self.exec_block(&program.body).await? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Null,
        };
        Ok(Outcome {
            stdout: self.stdout.buf,
            result,
        })
    }

    fn exec_block<'s>(&'s mut self, body: &'s [Stmt]) -> BoxFuture<'s, Result<Flow, McpError>> {
        Box::pin(async move {
            for stmt in body {
                if let Flow::Return(value) = self.exec(stmt).await? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Normal)
        })
    }

    /// Run `body` in a fresh scope, optionally seeded with one binding.
    async fn exec_scoped(
        &mut self,
        body: &[Stmt],
        seed: Option<(&str, Value, bool)>,
    ) -> Result<Flow, McpError> {
        let mut scope = HashMap::new();
        if let Some((name, value, constant)) = seed {
            scope.insert(name.to_string(), Binding { value, constant });
        }
        self.scopes.push(scope);
        let flow = self.exec_block(body).await;
        self.scopes.pop();
        flow
    }

    async fn exec(&mut self, stmt: &Stmt) -> Result<Flow, McpError> {
        self.steps = self.steps.wrapping_add(1);
        if self.steps % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }

        match stmt {
            Stmt::Let {
                name,
                init,
                constant,
                line,
            } => {
                let value = match init {
                    Some(expr) => self.eval(expr).await?,
                    None => Value::Null,
                };
                self.declare(name, value, *constant, *line)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr).await?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if truthy(&self.eval(cond).await?) {
                    self.exec_scoped(then, None).await
                } else if let Some(otherwise) = otherwise {
                    self.exec_scoped(otherwise, None).await
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::ForOf {
                name,
                constant,
                iter,
                body,
            } => {
                let items = match self.eval(iter).await? {
                    Value::Array(items) => items,
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    other => {
                        return Err(script(
                            iter.line,
                            format!("{} is not iterable", type_name(&other)),
                        ))
                    }
                };
                for item in items {
                    if let Flow::Return(value) =
                        self.exec_scoped(body, Some((name.as_str(), item, *constant))).await?
                    {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr).await?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Block(body) => self.exec_scoped(body, None).await,
        }
    }

    fn declare(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
        line: usize,
    ) -> Result<(), McpError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| script(line, "no active scope"))?;
        if scope.contains_key(name) {
            return Err(script(
                line,
                format!("identifier '{}' has already been declared", name),
            ));
        }
        scope.insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    fn eval<'s>(&'s mut self, expr: &'s Expr) -> BoxFuture<'s, Result<Value, McpError>> {
        Box::pin(async move {
            let line = expr.line;
            match &expr.kind {
                ExprKind::Num(n) => Ok(number(*n)),
                ExprKind::Str(s) => Ok(Value::String(s.clone())),
                ExprKind::Bool(b) => Ok(Value::Bool(*b)),
                ExprKind::Null | ExprKind::Undefined => Ok(Value::Null),
                ExprKind::Template(segments) => {
                    let mut out = String::new();
                    for segment in segments {
                        match segment {
                            TemplateSegment::Text(text) => out.push_str(text),
                            TemplateSegment::Expr(expr) => {
                                out.push_str(&to_display(&self.eval(expr).await?))
                            }
                        }
                    }
                    Ok(Value::String(out))
                }
                ExprKind::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item).await?);
                    }
                    Ok(Value::Array(values))
                }
                ExprKind::Object(fields) => {
                    let mut map = Map::new();
                    for (key, value) in fields {
                        let value = self.eval(value).await?;
                        map.insert(key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }
                ExprKind::Ident(name) => self
                    .lookup(name)
                    .map(|binding| binding.value.clone())
                    .ok_or_else(|| script(line, format!("{} is not defined", name))),
                ExprKind::Member {
                    object,
                    property,
                    optional,
                } => {
                    let object = self.eval(object).await?;
                    if object.is_null() {
                        if *optional {
                            return Ok(Value::Null);
                        }
                        return Err(script(
                            line,
                            format!("cannot read properties of null (reading '{}')", property),
                        ));
                    }
                    Ok(get_property(&object, property))
                }
                ExprKind::Index { object, index } => {
                    let object = self.eval(object).await?;
                    let index = self.eval(index).await?;
                    if object.is_null() {
                        return Err(script(
                            line,
                            format!(
                                "cannot read properties of null (reading '{}')",
                                to_display(&index)
                            ),
                        ));
                    }
                    Ok(get_index(&object, &index))
                }
                ExprKind::Call { callee, args } => self.call(callee, args, line).await,
                ExprKind::Unary(op, operand) => {
                    let value = self.eval(operand).await?;
                    Ok(match op {
                        UnaryOp::Not => Value::Bool(!truthy(&value)),
                        UnaryOp::Neg => number(-to_number(&value)),
                        UnaryOp::Plus => number(to_number(&value)),
                        UnaryOp::TypeOf => Value::String(type_name(&value).to_string()),
                    })
                }
                ExprKind::Binary(op, left, right) => {
                    let left = self.eval(left).await?;
                    let right = self.eval(right).await?;
                    Ok(binary(*op, &left, &right))
                }
                ExprKind::Logical(op, left, right) => {
                    let left = self.eval(left).await?;
                    let short_circuit = match op {
                        LogicalOp::And => !truthy(&left),
                        LogicalOp::Or => truthy(&left),
                        LogicalOp::Nullish => !left.is_null(),
                    };
                    if short_circuit {
                        Ok(left)
                    } else {
                        self.eval(right).await
                    }
                }
                ExprKind::Conditional(cond, then, otherwise) => {
                    if truthy(&self.eval(cond).await?) {
                        self.eval(then).await
                    } else {
                        self.eval(otherwise).await
                    }
                }
                ExprKind::Assign { target, op, value } => {
                    let place = self.place(target).await?;
                    let value = self.eval(value).await?;
                    let value = match op {
                        Some(op) => binary(*op, &self.read(&place, line)?, &value),
                        None => value,
                    };
                    *self.resolve_mut(&place, line, true)? = value.clone();
                    Ok(value)
                }
            }
        })
    }

    fn place<'s>(&'s mut self, expr: &'s Expr) -> BoxFuture<'s, Result<Place, McpError>> {
        Box::pin(async move {
            match &expr.kind {
                ExprKind::Ident(name) => Ok(Place {
                    root: name.clone(),
                    path: Vec::new(),
                }),
                ExprKind::Member {
                    object, property, ..
                } => {
                    let mut place = self.place(object).await?;
                    place.path.push(Key::Field(property.clone()));
                    Ok(place)
                }
                ExprKind::Index { object, index } => {
                    let mut place = self.place(object).await?;
                    let key = match self.eval(index).await? {
                        Value::String(s) => Key::Field(s),
                        Value::Number(n) => match n.as_u64() {
                            Some(i) => Key::Index(i as usize),
                            None => Key::Field(format_number(n.as_f64().unwrap_or(f64::NAN))),
                        },
                        other => Key::Field(to_display(&other)),
                    };
                    place.path.push(key);
                    Ok(place)
                }
                _ => Err(script(expr.line, "invalid assignment target")),
            }
        })
    }

    fn read(&self, place: &Place, line: usize) -> Result<Value, McpError> {
        let mut value = &self
            .lookup(&place.root)
            .ok_or_else(|| script(line, format!("{} is not defined", place.root)))?
            .value;
        for key in &place.path {
            value = match (value, key) {
                (Value::Object(map), Key::Field(field)) => map.get(field).unwrap_or(&Value::Null),
                (Value::Array(items), Key::Index(i)) => items.get(*i).unwrap_or(&Value::Null),
                _ => &Value::Null,
            };
        }
        Ok(value.clone())
    }

    /// Mutable access to `place`, creating the final field or slot.
    fn resolve_mut(
        &mut self,
        place: &Place,
        line: usize,
        assigning: bool,
    ) -> Result<&mut Value, McpError> {
        let binding = self
            .lookup_mut(&place.root)
            .ok_or_else(|| script(line, format!("{} is not defined", place.root)))?;
        if assigning && binding.constant && place.path.is_empty() {
            return Err(script(
                line,
                format!("assignment to constant variable '{}'", place.root),
            ));
        }

        let mut value = &mut binding.value;
        for key in &place.path {
            value = match (value, key) {
                (Value::Object(map), Key::Field(field)) => {
                    map.entry(field.clone()).or_insert(Value::Null)
                }
                (Value::Array(items), Key::Index(i)) => {
                    if *i > MAX_ARRAY_INDEX {
                        return Err(script(
                            line,
                            format!("array index {} is out of range", i),
                        ));
                    }
                    if *i >= items.len() {
                        items.resize(*i + 1, Value::Null);
                    }
                    &mut items[*i]
                }
                (Value::Array(_), Key::Field(field)) => {
                    return Err(script(
                        line,
                        format!("cannot set property '{}' of an array", field),
                    ))
                }
                (other, key) => {
                    let key = match key {
                        Key::Field(field) => field.clone(),
                        Key::Index(i) => i.to_string(),
                    };
                    return Err(script(
                        line,
                        format!("cannot set properties of {} (setting '{}')", type_name(other), key),
                    ));
                }
            };
        }
        Ok(value)
    }

    async fn args(&mut self, args: &[Expr]) -> Result<Vec<Value>, McpError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg).await?);
        }
        Ok(values)
    }

    async fn call(&mut self, callee: &Expr, args: &[Expr], line: usize) -> Result<Value, McpError> {
        match &callee.kind {
            ExprKind::Ident(name) if name == "$call" => {
                let args = self.args(args).await?;
                self.tool_call(args, line).await
            }
            ExprKind::Ident(name) if name == "print" => {
                let args = self.args(args).await?;
                self.print(&args);
                Ok(Value::Null)
            }
            ExprKind::Member {
                object, property, ..
            } => {
                if let ExprKind::Ident(namespace) = &object.kind {
                    if self.lookup(namespace).is_none() {
                        if let Some(result) = self.builtin(namespace, property, args, line).await {
                            return result;
                        }
                    }
                }
                self.method(object, property, args, line).await
            }
            _ => Err(script(
                line,
                format!("{} is not a function", callee_name(callee)),
            )),
        }
    }

    /// Namespaced builtins. `None` when `namespace.name` is not one.
    async fn builtin(
        &mut self,
        namespace: &str,
        name: &str,
        args: &[Expr],
        line: usize,
    ) -> Option<Result<Value, McpError>> {
        let known = matches!(
            (namespace, name),
            ("console", "log" | "info" | "warn" | "error" | "debug")
                | ("JSON", "stringify" | "parse")
                | ("Object", "keys" | "values" | "entries")
                | ("Array", "isArray")
                | ("Math", "floor" | "ceil" | "round" | "abs" | "min" | "max")
        );
        if !known {
            return None;
        }
        let args = match self.args(args).await {
            Ok(args) => args,
            Err(e) => return Some(Err(e)),
        };
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);

        Some(match (namespace, name) {
            ("console", _) => {
                self.print(&args);
                Ok(Value::Null)
            }
            ("JSON", "stringify") => json_stringify(&arg(0), args.get(2), line),
            ("JSON", "parse") => match arg(0) {
                Value::String(text) => serde_json::from_str(&text)
                    .map_err(|e| script(line, format!("JSON.parse: {}", e))),
                other => Err(script(
                    line,
                    format!("JSON.parse expects a string, got {}", type_name(&other)),
                )),
            },
            ("Object", kind) => match arg(0) {
                Value::Object(map) => Ok(Value::Array(match kind {
                    "keys" => map.keys().cloned().map(Value::String).collect(),
                    "values" => map.values().cloned().collect(),
                    _ => map
                        .into_iter()
                        .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
                        .collect(),
                })),
                Value::Array(items) => Ok(Value::Array(match kind {
                    "keys" => (0..items.len()).map(|i| Value::String(i.to_string())).collect(),
                    "values" => items,
                    _ => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| Value::Array(vec![Value::String(i.to_string()), v]))
                        .collect(),
                })),
                Value::Null => Err(script(
                    line,
                    format!("Object.{} called on null", kind),
                )),
                _ => Ok(Value::Array(Vec::new())),
            },
            ("Array", _) => Ok(Value::Bool(arg(0).is_array())),
            ("Math", "min" | "max") => {
                let numbers = args.iter().map(to_number);
                Ok(number(if name == "min" {
                    numbers.fold(f64::INFINITY, f64::min)
                } else {
                    numbers.fold(f64::NEG_INFINITY, f64::max)
                }))
            }
            ("Math", _) => {
                let n = to_number(&arg(0));
                Ok(number(match name {
                    "floor" => n.floor(),
                    "ceil" => n.ceil(),
                    "round" => (n + 0.5).floor(),
                    _ => n.abs(),
                }))
            }
            _ => return None,
        })
    }

    /// Methods on strings and arrays.
    async fn method(
        &mut self,
        object: &Expr,
        name: &str,
        args: &[Expr],
        line: usize,
    ) -> Result<Value, McpError> {
        if name == "push" {
            let place = self.place(object).await?;
            let values = self.args(args).await?;
            return match self.resolve_mut(&place, line, false)? {
                Value::Array(items) => {
                    items.extend(values);
                    Ok(number(items.len() as f64))
                }
                other => Err(script(
                    line,
                    format!("{}.push is not a function", type_name(other)),
                )),
            };
        }

        let receiver = self.eval(object).await?;
        let args = self.args(args).await?;
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);

        match (&receiver, name) {
            (Value::Array(items), "join") => {
                let separator = match arg(0) {
                    Value::Null => ",".to_string(),
                    other => to_display(&other),
                };
                Ok(Value::String(
                    items
                        .iter()
                        .map(|v| if v.is_null() { String::new() } else { to_display(v) })
                        .collect::<Vec<_>>()
                        .join(&separator),
                ))
            }
            (Value::Array(items), "includes") => {
                let needle = arg(0);
                Ok(Value::Bool(items.iter().any(|v| strict_equals(v, &needle))))
            }
            (Value::Array(items), "indexOf") => {
                let needle = arg(0);
                Ok(number(
                    items
                        .iter()
                        .position(|v| strict_equals(v, &needle))
                        .map_or(-1.0, |i| i as f64),
                ))
            }
            (Value::Array(items), "slice") => {
                let (start, end) = slice_bounds(items.len(), &args);
                Ok(Value::Array(items[start..end].to_vec()))
            }
            (Value::String(s), "slice") => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = slice_bounds(chars.len(), &args);
                Ok(Value::String(chars[start..end].iter().collect()))
            }
            (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&to_display(&arg(0))))),
            (Value::String(s), "startsWith") => {
                Ok(Value::Bool(s.starts_with(&to_display(&arg(0)))))
            }
            (Value::String(s), "endsWith") => Ok(Value::Bool(s.ends_with(&to_display(&arg(0))))),
            (Value::String(s), "indexOf") => {
                let needle = to_display(&arg(0));
                Ok(number(
                    s.find(&needle)
                        .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
                ))
            }
            (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
            (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
            (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
            (Value::String(s), "split") => {
                let parts: Vec<Value> = match arg(0) {
                    Value::Null => vec![Value::String(s.clone())],
                    separator => {
                        let separator = to_display(&separator);
                        if separator.is_empty() {
                            s.chars().map(|c| Value::String(c.to_string())).collect()
                        } else {
                            s.split(separator.as_str())
                                .map(|p| Value::String(p.to_string()))
                                .collect()
                        }
                    }
                };
                Ok(Value::Array(parts))
            }
            (_, "toString") => Ok(Value::String(to_display(&receiver))),
            (Value::Null, _) => Err(script(
                line,
                format!("cannot read properties of null (reading '{}')", name),
            )),
            _ => Err(script(
                line,
                format!("{}.{} is not a function", callee_name(object), name),
            )),
        }
    }

    async fn tool_call(&mut self, args: Vec<Value>, line: usize) -> Result<Value, McpError> {
        let mut args = args.into_iter();
        let (provider, tool) = match (args.next(), args.next()) {
            (Some(Value::String(provider)), Some(Value::String(tool))) => (provider, tool),
            _ => {
                return Err(script(
                    line,
                    "$call expects (providerId: string, toolName: string, args?: object)",
                ))
            }
        };
        let arguments = match args.next() {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value @ Value::Object(_)) => value,
            Some(other) => {
                return Err(script(
                    line,
                    format!("$call arguments must be an object, got {}", type_name(&other)),
                ))
            }
        };

        tracing::debug!(provider = %provider, tool = %tool, line, "script tool call");
        let raw = self.bridge.call(&provider, &tool, arguments).await?;
        tool_payload(raw).map_err(|message| {
            script(
                line,
                format!("tool '{}' on '{}' failed: {}", tool, provider, message),
            )
        })
    }

    fn print(&mut self, args: &[Value]) {
        let line = args
            .iter()
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.stdout.write_line(&line);
    }
}

/// Unwrap a `tools/call` result into what `$call` returns.
///
/// `structuredContent` wins; otherwise text content is joined and, when it
/// is a single JSON document, parsed. `isError` results become errors.
pub fn tool_payload(raw: Value) -> Result<Value, String> {
    let is_text = |block: &Value| block.get("type").and_then(Value::as_str) == Some("text");
    let blocks = raw.get("content").and_then(Value::as_array);
    let texts: Vec<String> = blocks
        .into_iter()
        .flatten()
        .filter(|block| is_text(block))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    let all_text = blocks.is_some_and(|blocks| !blocks.is_empty() && blocks.iter().all(is_text));

    if raw.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(if texts.is_empty() {
            "tool reported an error".to_string()
        } else {
            texts.join("\n")
        });
    }
    if let Some(structured) = raw.get("structuredContent") {
        return Ok(structured.clone());
    }
    if all_text {
        let text = texts.join("\n");
        return Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)));
    }
    Ok(raw)
}

fn script(line: usize, message: impl Into<String>) -> McpError {
    McpError::Script(ScriptError::new(line, message))
}

fn callee_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Member {
            object, property, ..
        } => format!("{}.{}", callee_name(object), property),
        _ => "expression".to_string(),
    }
}

fn json_stringify(value: &Value, indent: Option<&Value>, line: usize) -> Result<Value, McpError> {
    let indent = match indent {
        Some(Value::Number(n)) => " ".repeat(n.as_u64().unwrap_or(0).min(10) as usize),
        Some(Value::String(s)) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(value)
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        let written = serde::Serialize::serialize(value, &mut serializer);
        written.map(|()| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(Value::String)
        .map_err(|e| script(line, format!("JSON.stringify: {}", e)))
}

fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let clamp = |v: Option<&Value>, default: usize| -> usize {
        match v {
            None | Some(Value::Null) => default,
            Some(v) => {
                let n = to_number(v).trunc();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    len.saturating_sub((-n) as usize)
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = clamp(args.first(), 0);
    let end = clamp(args.get(1), len);
    (start, end.max(start))
}

fn get_property(object: &Value, property: &str) -> Value {
    match (object, property) {
        (Value::Array(items), "length") => number(items.len() as f64),
        (Value::String(s), "length") => number(s.encode_utf16().count() as f64),
        (Value::Object(map), _) => map.get(property).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn get_index(object: &Value, index: &Value) -> Value {
    match (object, index) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::String(s), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| s.chars().nth(i as usize))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        (_, Value::String(key)) => get_property(object, key),
        (Value::Object(map), other) => map.get(&to_display(other)).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// A JSON number, integral when it can be. Non-finite results become null.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        // -0 prints as 0.
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Number formatting as scripts see it.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else {
        format!("{}", n)
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// String conversion as in template literals and `+`.
fn to_display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| if v.is_null() { String::new() } else { to_display(v) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_) | Value::Bool(_), Value::String(_) | Value::Bool(_))
        | (Value::String(_) | Value::Bool(_), Value::Number(_))
        | (Value::String(_), Value::Bool(_)) => to_number(left) == to_number(right),
        _ => strict_equals(left, right),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
            if stringy(left) || stringy(right) {
                Value::String(format!("{}{}", to_display(left), to_display(right)))
            } else {
                number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => number(to_number(left) - to_number(right)),
        BinaryOp::Mul => number(to_number(left) * to_number(right)),
        BinaryOp::Div => number(to_number(left) / to_number(right)),
        BinaryOp::Rem => number(to_number(left) % to_number(right)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => to_number(left).partial_cmp(&to_number(right)),
            };
            Value::Bool(ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::Gt => o.is_gt(),
                BinaryOp::Le => o.is_le(),
                _ => o.is_ge(),
            }))
        }
    }
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;
