use crate::mcp::mcp_wrap;
use crate::tools::{tool_descriptors, CallError, ToolCall, Tools, PROTOCOL_VERSION};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data: None,
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

/// Framing headers from clients that use `Content-Length` framing.
fn is_frame_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("content-length:") || lower.starts_with("content-type:")
}

fn frame_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Read the next message: a single JSON line, or a `Content-Length` framed
/// body read as exactly that many bytes. `None` at end of input.
async fn read_message<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // A blank line ends a header block.
            let Some(len) = content_length.take() else {
                continue;
            };
            let mut body = vec![0u8; len];
            match reader.read_exact(&mut body).await {
                Ok(_) => return Ok(Some(String::from_utf8_lossy(&body).into_owned())),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    warn!("input ended inside a {} byte frame", len);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(len) = frame_length(trimmed) {
            content_length = Some(len);
            continue;
        }
        if is_frame_header(trimmed) {
            continue;
        }
        return Ok(Some(trimmed.to_string()));
    }
}

/// Serve JSON-RPC on stdio until EOF. Requests are handled one at a time;
/// responses are newline-delimited.
pub async fn run_stdio_server(tools: Tools) -> anyhow::Result<()> {
    info!(
        "Starting github-tools-mcp stdio server; protocol={}",
        PROTOCOL_VERSION
    );
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut out = tokio::io::stdout();

    while let Some(message) = read_message(&mut reader).await? {
        let message = message.trim();
        if message.is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(message) {
            Ok(req) => {
                debug!("Received method={}", req.method);
                let is_notification = req.id.is_none();
                let resp = dispatch(&tools, req).await;
                if is_notification {
                    continue;
                }
                resp
            }
            Err(e) => rpc_error(None, -32700, &format!("Parse error: {}", e)),
        };
        let payload = serde_json::to_string(&resp)?;
        out.write_all(payload.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    info!("stdin closed; shutting down");
    Ok(())
}

async fn dispatch(tools: &Tools, req: Request) -> Response {
    if req.jsonrpc != "2.0" {
        warn!("unexpected jsonrpc version {:?}", req.jsonrpc);
    }
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id),
        "tools/list" => rpc_ok(req.id, serde_json::json!({ "tools": tool_descriptors() })),
        "tools/call" => handle_tools_call(tools, req.id, req.params).await,
        "resources/list" => rpc_ok(req.id, serde_json::json!({ "resources": [] })),
        "resources/templates/list" => handle_resource_templates(req.id),
        "resources/read" => handle_resource_read(req.id, req.params),
        "ping" => rpc_ok(req.id, serde_json::json!({})),
        m if m.starts_with("notifications/") => rpc_ok(req.id, Value::Null),
        other => rpc_error(req.id, -32601, &format!("Method not found: {}", other)),
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {}, "resources": {} },
            "serverInfo": {
                "name": "github-tools-mcp",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tools_call(tools: &Tools, id: Option<Id>, params: Value) -> Response {
    let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
        return rpc_error(id, -32602, "Invalid params");
    };
    let parsed = match ToolCall::parse(&call.name, call.arguments) {
        Ok(p) => p,
        Err(e @ CallError::UnknownTool(_)) => return rpc_error(id, -32601, &e.to_string()),
        Err(e @ CallError::InvalidParams { .. }) => return rpc_error(id, -32602, &e.to_string()),
    };
    match tools.run(parsed).await {
        Ok(text) => rpc_ok(id, mcp_wrap(text, false)),
        Err(e) => {
            info!("tool {} returned {}", call.name, e.kind());
            rpc_ok(id, mcp_wrap(e.to_string(), true))
        }
    }
}

const ECHO_SCHEME: &str = "echo://";

fn handle_resource_templates(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "resourceTemplates": [{
                "uriTemplate": "echo://{message}",
                "name": "echo",
                "description": "Echo a message as a resource",
                "mimeType": "text/plain"
            }]
        }),
    )
}

fn handle_resource_read(id: Option<Id>, params: Value) -> Response {
    let Some(uri) = params.get("uri").and_then(|u| u.as_str()) else {
        return rpc_error(id, -32602, "Invalid params: missing uri");
    };
    let Some(raw) = uri.strip_prefix(ECHO_SCHEME) else {
        return rpc_error(id, -32602, &format!("Unknown resource: {}", uri));
    };
    let message = urlencoding::decode(raw)
        .map(|m| m.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    rpc_ok(
        id,
        serde_json::json!({
            "contents": [{
                "uri": uri,
                "mimeType": "text/plain",
                "text": format!("Resource echo: {}", message),
            }]
        }),
    )
}
