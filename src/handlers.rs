// handlers — operability endpoints alongside the MCP transport.
//
//   GET /              server identity + endpoint map
//   GET /health        liveness, tool count, active sessions, auth flag
//   GET /tools         flattened tool list (name / description / schema)
//   GET /openapi.json  OpenAPI document for the routes above

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::{OpenApi, ToSchema};

use crate::mcp::protocol::MCP_PROTOCOL_VERSION;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub tools_count: usize,
    pub active_sessions: usize,
    pub auth_enabled: bool,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    #[schema(value_type = Object)]
    pub input_schema: Value,
    pub required_params: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolsResponse {
    pub tools: Vec<ToolSummary>,
}

/// GET /health — public liveness probe.
#[utoipa::path(get, path = "/health", tag = "health",
    responses((status = 200, description = "Server status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tools_count: state.registry.len(),
        active_sessions: state.transport.active_session_count(),
        auth_enabled: state.auth.enabled(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET / — server identity and where to find things.
#[utoipa::path(get, path = "/", tag = "health",
    responses((status = 200, description = "Server identity and endpoint map", body = Value))
)]
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let protected = if state.auth.enabled() { " (requires X-API-Key)" } else { "" };
    let tools_note = if state.auth.public_tools { " (public)" } else { protected };

    Json(json!({
        "name": state.title,
        "version": state.server_info.version,
        "protocol": format!("MCP {}", MCP_PROTOCOL_VERSION),
        "endpoints": {
            "sse": format!("/sse{}", protected),
            "message": format!("/message{}", protected),
            "health": "/health (public)",
            "tools": format!("/tools{}", tools_note),
            "docs": "/openapi.json (public)",
        }
    }))
}

/// GET /tools — flattened tool list for humans and dashboards.
#[utoipa::path(get, path = "/tools", tag = "tools",
    responses(
        (status = 200, description = "Registered tools", body = ToolsResponse),
        (status = 401, description = "Missing or invalid API key", body = Value)
    )
)]
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state
        .registry
        .iter()
        .map(|tool| {
            let input_schema = tool.input_schema();
            let required_params = input_schema
                .get("required")
                .and_then(|r| r.as_array())
                .map(|r| r.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            ToolSummary {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema,
                required_params,
            }
        })
        .collect();
    Json(ToolsResponse { tools })
}

/// GET /openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MCP Tool Host",
        description = "MCP tool server: JSON-RPC 2.0 over SSE (`GET /sse` + `POST /message`) plus operability endpoints."
    ),
    paths(health, root, list_tools),
    components(schemas(HealthResponse, ToolSummary, ToolsResponse)),
    tags(
        (name = "health", description = "Liveness and identity"),
        (name = "tools", description = "Tool introspection")
    )
)]
pub struct ApiDoc;
