// mcp/protocol — JSON-RPC 2.0 dispatch for the MCP server side.
//!
//! Supported methods:
//! - `initialize` — protocol version, capabilities, server identity
//! - `initialized` / `notifications/initialized` — client ack (no-op)
//! - `tools/list` — list all registered tools
//! - `tools/call` — execute a tool
//! - `ping` — keepalive check
//!
//! The handler is stateless between calls: it only reads the fixed registry
//! and the server identity given at construction.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::tool::{ToolError, ToolRegistry, ToolResult};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const TOOL_EXECUTION_ERROR: i32 = -32000;

// ── Envelopes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response envelope. Exactly one of `result` / `error` is set; `id` is
/// always serialized and is `null` when the request carried none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }
}

/// `{name, version}` reported by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: &str, version: &str) -> Self {
        Self { name: name.to_string(), version: version.to_string() }
    }
}

// ── Handler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct McpProtocolHandler {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl McpProtocolHandler {
    pub fn new(registry: Arc<ToolRegistry>, server_info: ServerInfo) -> Self {
        Self { registry, server_info }
    }

    /// Parse one raw JSON-RPC message and return the serialized response.
    pub async fn handle_request(&self, raw: &str) -> String {
        let response = match serde_json::from_str::<Value>(raw) {
            Err(e) => JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)),
            Ok(value) => self.handle_value(value).await,
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            tracing::error!("MCP: failed to serialize response: {}", e);
            json!({
                "jsonrpc": "2.0",
                "id": response.id,
                "error": { "code": TOOL_EXECUTION_ERROR, "message": "Response serialization failed" }
            })
            .to_string()
        })
    }

    async fn handle_value(&self, value: Value) -> JsonRpcResponse {
        if !value.is_object() {
            return JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, "Invalid Request: expected a JSON object");
        }
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid Request: {}", e)),
        }
    }

    /// Dispatch an already-decoded request.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.unwrap_or(Value::Null);
        tracing::debug!(method = %request.method, "MCP: incoming request");

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "initialized" | "notifications/initialized" | "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.tools_list_result()),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": self.server_info,
        })
    }

    fn tools_list_result(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .iter()
            .map(|tool| {
                let mut entry = json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                });
                if let Some(examples) = tool.few_shot_examples().filter(|e| !e.is_empty()) {
                    entry["fewShotExamples"] = Value::Array(examples);
                }
                if let Some(examples) = tool.negative_few_shot_examples().filter(|e| !e.is_empty()) {
                    entry["negativeFewShotExamples"] = Value::Array(examples);
                }
                entry
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or_else(|| json!({}));
        let tool_name = match params.get("name").and_then(|n| n.as_str()) {
            Some(name) if !name.is_empty() => name,
            _ => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Invalid params: missing tool name"),
        };

        let Some(tool) = self.registry.get(tool_name) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Tool not found: {}", tool_name));
        };

        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    "Invalid params: arguments must be an object",
                );
            }
        };

        let logged_arguments = Value::Object(arguments.clone());
        tracing::info!(tool = %tool_name, arguments = %logged_arguments, "MCP: tools/call");

        let outcome = AssertUnwindSafe(tool.execute(arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ToolError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, call_result(&result)),
            Err(e) => {
                tracing::error!(tool = %tool_name, "MCP: tool execution error: {}", e);
                JsonRpcResponse::failure(id, TOOL_EXECUTION_ERROR, format!("Tool execution error: {}", e))
            }
        }
    }
}

/// Wrap a [`ToolResult`] as the MCP `tools/call` result object.
pub fn call_result(result: &ToolResult) -> Value {
    json!({
        "content": [{ "type": "text", "text": result.content }],
        "isError": result.is_error,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tool::{Arguments, DeclarativeTool, Tool, ToolParameter};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always escapes with an error"
        }
        fn input_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _arguments: Arguments) -> Result<ToolResult, ToolError> {
            Err(ToolError::Execution("backend unreachable".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Tool for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn description(&self) -> &str {
            "Panics"
        }
        fn input_schema(&self) -> Value {
            json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _arguments: Arguments) -> Result<ToolResult, ToolError> {
            panic!("boom");
        }
    }

    fn handler() -> McpProtocolHandler {
        let echo = DeclarativeTool::new("echo", "Echo text back", |args: Arguments| async move {
            match args.get("text").and_then(|t| t.as_str()) {
                Some(text) => ToolResult::text(text),
                None => ToolResult::error("Missing required parameter: text"),
            }
        })
        .param(ToolParameter::required("text", "string", "Text to echo"))
        .negative_few_shot(json!({ "request": "translate this", "reason": "echo does not translate" }));

        let registry = ToolRegistry::new(vec![Arc::new(echo), Arc::new(Failing), Arc::new(Panicking)]).unwrap();
        McpProtocolHandler::new(Arc::new(registry), ServerInfo::new("test-server", "1.0.0"))
    }

    async fn call(raw: &str) -> Value {
        serde_json::from_str(&handler().handle_request(raw).await).unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_version_and_identity() {
        let resp = call(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(resp["result"]["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(resp["result"]["serverInfo"]["name"], "test-server");
        assert_eq!(resp["result"]["serverInfo"]["version"], "1.0.0");
    }

    #[tokio::test]
    async fn initialized_and_ping_return_empty_result() {
        for method in ["initialized", "notifications/initialized", "ping"] {
            let raw = json!({ "jsonrpc": "2.0", "id": "a", "method": method }).to_string();
            let resp = call(&raw).await;
            assert_eq!(resp["result"], json!({}), "method {}", method);
            assert_eq!(resp["id"], "a");
        }
    }

    #[tokio::test]
    async fn tools_list_includes_schema_and_hints() {
        let resp = call(r#"{"jsonrpc":"2.0","id":7,"method":"tools/list","params":{}}"#).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["text"]));
        assert!(tools[0].get("fewShotExamples").is_none());
        assert_eq!(tools[0]["negativeFewShotExamples"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tools_call_wraps_result() {
        let resp = call(
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#,
        )
        .await;
        assert_eq!(resp["result"], json!({ "content": [{ "type": "text", "text": "hi" }], "isError": false }));
        assert!(resp.get("error").is_none());
    }

    #[tokio::test]
    async fn application_error_stays_inside_success_envelope() {
        let resp = call(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo"}}"#).await;
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
        assert_eq!(resp["result"]["content"][0]["text"], "Missing required parameter: text");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let resp = call(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"bogus"}}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["message"], "Tool not found: bogus");
        assert!(resp.get("result").is_none());
    }

    #[tokio::test]
    async fn missing_tool_name_is_invalid_params() {
        let resp = call(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{}}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["message"], "Invalid params: missing tool name");

        let resp = call(r#"{"jsonrpc":"2.0","id":6,"method":"tools/call"}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let resp = call(
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"echo","arguments":[1,2]}}"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn escaped_error_maps_to_execution_error() {
        let resp = call(r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"failing"}}"#).await;
        assert_eq!(resp["error"]["code"], TOOL_EXECUTION_ERROR);
        assert_eq!(resp["error"]["message"], "Tool execution error: backend unreachable");
        assert_eq!(resp["id"], 9);
    }

    #[tokio::test]
    async fn panic_maps_to_execution_error() {
        let resp = call(r#"{"jsonrpc":"2.0","id":10,"method":"tools/call","params":{"name":"panicking"}}"#).await;
        assert_eq!(resp["error"]["code"], TOOL_EXECUTION_ERROR);
        assert!(resp["error"]["message"].as_str().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let resp = call(r#"{"jsonrpc":"2.0","id":11,"method":"resources/list"}"#).await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(resp["error"]["message"], "Method not found: resources/list");
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error_with_null_id() {
        let resp = call("{not json").await;
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["error"]["message"].as_str().unwrap().starts_with("Parse error:"));
        assert!(resp["id"].is_null());
    }

    #[tokio::test]
    async fn non_object_payload_is_invalid_request() {
        let resp = call("[1,2,3]").await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert!(resp["id"].is_null());
    }

    #[tokio::test]
    async fn missing_id_round_trips_as_null() {
        let resp = call(r#"{"jsonrpc":"2.0","method":"ping"}"#).await;
        assert!(resp.as_object().unwrap().contains_key("id"));
        assert!(resp["id"].is_null());
    }

    #[tokio::test]
    async fn ids_of_every_type_round_trip() {
        for id in [json!(42), json!("req-1"), json!(1.5)] {
            let raw = json!({ "jsonrpc": "2.0", "id": id, "method": "nope" }).to_string();
            let resp = call(&raw).await;
            assert_eq!(resp["id"], id);
        }
    }
}
