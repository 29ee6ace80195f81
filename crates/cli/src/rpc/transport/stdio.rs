// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process transport speaking newline-delimited JSON over pipes.
//!
//! Outbound frames are written to stdin followed by `\n`. A background
//! reader accumulates stdout bytes in a [`LineBuffer`] so that a message
//! split across reads is only parsed once its newline arrives. stderr is
//! drained to the debug log and never parsed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{EventSink, Frame, Transport, TransportError, TransportEvent};
use crate::registry::StdioDescriptor;

/// How long a child gets to exit on its own after stdin closes.
const EXIT_GRACE: Duration = Duration::from_millis(1000);

/// Splits a byte stream into lines, keeping partial lines across pushes.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// terminator. A trailing `\r` is stripped too.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Bytes received since the last newline.
    pub fn remainder(&self) -> &[u8] {
        &self.pending
    }
}

/// Stdio transport for JSON-RPC communication with a child process.
///
/// The child is spawned with `kill_on_drop`, so dropping the transport
/// never leaks a process.
pub struct StdioTransport {
    provider: String,

    /// The child process, taken on close.
    child: parking_lot::Mutex<Option<Child>>,

    /// Writer half. `None` once closed.
    stdin: Mutex<Option<ChildStdin>>,

    reader: tokio::task::JoinHandle<()>,
}

impl StdioTransport {
    /// Spawn the provider process and start reading its output.
    pub async fn spawn(
        provider: &str,
        def: &StdioDescriptor,
        sink: EventSink,
    ) -> Result<Self, TransportError> {
        let mut cmd = Command::new(&def.command);
        cmd.args(&def.args);
        for (key, value) in &def.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = def.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::info!(provider = %provider, command = %def.command, args = ?def.args, "spawning MCP server");

        let mut child = cmd
            .spawn()
            .map_err(|e| TransportError::Spawn(format!("{}: {}", def.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::StdinNotAvailable)?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::StdoutNotAvailable)?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(provider.to_string(), stderr));
        }

        let reader = tokio::spawn(read_stdout(provider.to_string(), stdout, sink));

        Ok(Self {
            provider: provider.to_string(),
            child: parking_lot::Mutex::new(Some(child)),
            stdin: Mutex::new(Some(stdin)),
            reader,
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn kind(&self) -> &'static str {
        "stdio"
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(TransportError::Shutdown)?;

        let mut line = frame.body;
        line.push(b'\n');
        stdin.write_all(&line).await?;
        stdin.flush().await?;
        Ok(())
    }

    fn abandon(&self, id: u64) {
        // Requests cannot be cancelled individually over a pipe.
        let mut guard = self.child.lock();
        if let Some(child) = guard.as_mut() {
            tracing::warn!(provider = %self.provider, id, "abandoning request; killing MCP server process");
            if let Err(e) = child.start_kill() {
                tracing::debug!(provider = %self.provider, error = %e, "kill failed");
            }
        }
    }

    /// 1. Closes stdin (signals EOF to child)
    /// 2. Waits briefly for process to exit
    /// 3. Forcefully kills if still running
    async fn close(&self) {
        {
            let mut guard = self.stdin.lock().await;
            if let Some(mut stdin) = guard.take() {
                let _ = stdin.flush().await;
            }
        }

        let child = self.child.lock().take();
        if let Some(mut child) = child {
            match timeout(EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(provider = %self.provider, %status, "MCP server exited");
                }
                Ok(Err(e)) => {
                    tracing::debug!(provider = %self.provider, error = %e, "waiting for MCP server failed");
                }
                Err(_) => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                }
            }
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_stdout<R>(provider: String, mut stdout: R, sink: EventSink)
where
    R: AsyncRead + Unpin,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; 8192];

    let reason = loop {
        let n = match stdout.read(&mut chunk).await {
            Ok(0) => break "stdout closed".to_string(),
            Ok(n) => n,
            Err(e) => break format!("stdout read error: {}", e),
        };

        for line in buffer.push(&chunk[..n]) {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let event = match serde_json::from_slice(&line) {
                Ok(value) => TransportEvent::Message(value),
                Err(e) => TransportEvent::Malformed {
                    line: String::from_utf8_lossy(&line).into_owned(),
                    error: e.to_string(),
                },
            };
            if sink.send(event).is_err() {
                return;
            }
        }
    };

    if !buffer.remainder().is_empty() {
        tracing::debug!(
            provider = %provider,
            bytes = buffer.remainder().len(),
            "discarding unterminated output at EOF"
        );
    }
    let _ = sink.send(TransportEvent::Closed { reason });
}

async fn drain_stderr<R>(provider: String, stderr: R)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim_end();
                if !trimmed.is_empty() {
                    tracing::debug!(provider = %provider, "stderr: {}", trimmed);
                }
            }
            Err(e) => {
                tracing::debug!(provider = %provider, error = %e, "stderr read error");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "stdio_tests.rs"]
mod tests;
