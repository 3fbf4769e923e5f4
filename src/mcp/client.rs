//! Subprocess-backed MCP client.

use super::protocol::*;
use crate::error::{AnirecError, Result};
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "anirec";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handle to a spawned tool server process.
///
/// Requests are serialized over the process's stdio pipe; every call is
/// bounded by the configured timeout so a hung server cannot hang a turn
/// forever. Dropping the client kills the child process.
pub struct McpClient {
    io: Mutex<Option<ServerIo>>,
    timeout: Duration,
    next_id: AtomicI64,
}

struct ServerIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl McpClient {
    /// Spawn the tool server process with piped stdio.
    pub async fn spawn(command: &str, args: &[String], timeout: Duration) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AnirecError::Mcp(format!("failed to launch {}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AnirecError::Mcp("tool server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnirecError::Mcp("tool server stdout unavailable".to_string()))?;

        debug!("Spawned tool server: {} {}", command, args.join(" "));

        Ok(Self {
            io: Mutex::new(Some(ServerIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            })),
            timeout,
            next_id: AtomicI64::new(1),
        })
    }

    /// Perform the MCP initialize handshake.
    pub async fn initialize(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION },
        });

        let result = self.request("initialize", Some(params)).await?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| AnirecError::Mcp(format!("bad initialize response: {}", e)))?;

        if let Some(server) = &init.server_info {
            info!("Tool server ready: {} {}", server.name, server.version);
        }

        self.notify("notifications/initialized", None).await
    }

    /// Enumerate the tools the server exposes.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result = self.request("tools/list", None).await?;
        let listing: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| AnirecError::Mcp(format!("bad tools/list response: {}", e)))?;
        Ok(listing.tools)
    }

    /// Invoke a tool and return its text content.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        let call: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| AnirecError::Mcp(format!("bad tools/call response: {}", e)))?;

        let text = call.joined_text();
        if call.is_error == Some(true) {
            return Err(AnirecError::Mcp(format!("{} failed: {}", name, text)));
        }
        Ok(text)
    }

    /// Kill the server process. Safe to call more than once.
    pub async fn shutdown(&self) {
        let mut io = self.io.lock().await;
        if let Some(mut server) = io.take() {
            if let Err(e) = server.child.kill().await {
                warn!("Failed to kill tool server: {}", e);
            }
        }
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::call(id, method, params);

        let mut io = self.io.lock().await;
        let server = io
            .as_mut()
            .ok_or_else(|| AnirecError::Mcp("tool server is closed".to_string()))?;

        tokio::time::timeout(self.timeout, Self::round_trip(server, &request, id))
            .await
            .map_err(|_| AnirecError::Mcp(format!("{} timed out", method)))?
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let request = JsonRpcRequest::notification(method, params);

        let mut io = self.io.lock().await;
        let server = io
            .as_mut()
            .ok_or_else(|| AnirecError::Mcp("tool server is closed".to_string()))?;

        Self::send(server, &request).await
    }

    async fn send(server: &mut ServerIo, request: &JsonRpcRequest) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        server
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AnirecError::Mcp(format!("tool server write failed: {}", e)))?;
        server
            .stdin
            .flush()
            .await
            .map_err(|e| AnirecError::Mcp(format!("tool server write failed: {}", e)))?;
        Ok(())
    }

    /// Send one request and read lines until its response arrives.
    /// Notifications and unrelated output from the server are skipped.
    async fn round_trip(server: &mut ServerIo, request: &JsonRpcRequest, id: i64) -> Result<Value> {
        Self::send(server, request).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = server
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| AnirecError::Mcp(format!("tool server read failed: {}", e)))?;

            if read == 0 {
                return Err(AnirecError::Mcp(
                    "tool server closed the connection".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response: JsonRpcResponse = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => {
                    debug!("Skipping non-response line from tool server");
                    continue;
                }
            };

            if response.id != Some(id) {
                continue;
            }

            if let Some(error) = response.error {
                return Err(AnirecError::Mcp(format!(
                    "{} failed: {} (code {})",
                    request.method, error.message, error.code
                )));
            }

            return Ok(response.result.unwrap_or(Value::Null));
        }
    }
}
