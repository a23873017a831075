use serde_json::Value;

// Build an MCP result envelope for tools/call outputs.
// - content: always a single text block.
// - isError: included only when true to keep payloads small.
pub fn mcp_wrap(text: String, is_error: bool) -> Value {
    let mut obj = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
    });
    if is_error {
        if let Some(map) = obj.as_object_mut() {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}
