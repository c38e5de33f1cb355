//! JSON-RPC 2.0 front-end over stdio.
//!
//! One JSON message per line on stdin, one response per line on stdout.
//! Supported methods: `initialize`, `ping`, `tools/list`, `tools/call`.
//! Messages without an `id` are notifications and get no response.
//!
//! Each request runs on its own task; responses funnel through a channel to a
//! single writer so lines never interleave.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::tools::ToolRouter;

pub const SERVER_NAME: &str = "routeplanner";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Handle one raw line. Returns the serialized response, if any.
pub async fn handle_line(router: &ToolRouter, line: &str) -> Option<String> {
    let response = match serde_json::from_str::<JsonRpcRequest>(line) {
        Ok(request) => dispatch(router, request).await?,
        Err(e) => {
            warn!("[Server] Unparsable message: {}", e);
            JsonRpcResponse::err(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))
        }
    };

    match serde_json::to_string(&response) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("[Server] Failed to serialize response: {}", e);
            None
        }
    }
}

async fn dispatch(router: &ToolRouter, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    debug!("[Server] <- {} (id: {:?})", request.method, request.id);

    // Notifications (no id) never get a response, whatever the method.
    let id = request.id?;

    if request.jsonrpc.as_deref() != Some("2.0") {
        return Some(JsonRpcResponse::err(
            id,
            INVALID_REQUEST,
            "jsonrpc must be \"2.0\"",
        ));
    }

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::ok(id, initialize_result(request.params.as_ref())),
        "ping" => JsonRpcResponse::ok(id, json!({})),
        "tools/list" => JsonRpcResponse::ok(id, json!({ "tools": router.definitions() })),
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<CallToolParams>(params) {
                Ok(call) => {
                    let output = router.call_tool(&call.name, call.arguments).await;
                    match serde_json::to_value(output) {
                        Ok(result) => JsonRpcResponse::ok(id, result),
                        Err(e) => JsonRpcResponse::err(id, INVALID_PARAMS, e.to_string()),
                    }
                }
                Err(e) => JsonRpcResponse::err(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                ),
            }
        }
        other => JsonRpcResponse::err(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
    };
    Some(response)
}

fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

fn send(tx: &mpsc::UnboundedSender<String>, response: String) {
    if tx.send(response).is_err() {
        warn!("[Server] stdout writer is gone, dropping response");
    }
}

/// Parse error reply for a line that is not UTF-8 (its id is unreadable).
fn invalid_utf8_response() -> String {
    let response = JsonRpcResponse::err(Value::Null, PARSE_ERROR, "Parse error: invalid UTF-8");
    serde_json::to_string(&response).unwrap_or_default()
}

/// Serve requests from stdin until it closes.
pub async fn run_stdio(router: Arc<ToolRouter>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    info!("[Server] Listening on stdio");

    loop {
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }
        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(e) => {
                warn!("[Server] Line is not valid UTF-8: {}", e);
                send(&tx, invalid_utf8_response());
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let router = router.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = handle_line(&router, &line).await {
                send(&tx, response);
            }
        });
    }

    info!("[Server] stdin closed, shutting down");
    drop(tx);
    writer
        .await
        .context("Writer task panicked")?
        .context("Failed to write to stdout")?;
    Ok(())
}
