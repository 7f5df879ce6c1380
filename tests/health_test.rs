// Health / identity endpoint integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mcp_toolhost::config::Config;
use mcp_toolhost::state::AppState;
use mcp_toolhost::tools::Profile;

fn test_app(api_key: Option<&str>) -> axum::Router {
    let mut config = Config::from_lookup(Profile::Time.default_port(), |_| None).unwrap();
    config.auth.api_key = api_key.map(str::to_string);
    let state = AppState::for_profile(Profile::Time, &config).unwrap();
    mcp_toolhost::create_router(state)
}

/// Collect a response body into a `serde_json::Value`.
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: axum::Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let response = get(test_app(None), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_tools_sessions_and_auth() {
    let json = body_json(get(test_app(None), "/health").await).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tools_count"], 2);
    assert_eq!(json["active_sessions"], 0);
    assert_eq!(json["auth_enabled"], false);
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn health_reflects_auth_flag() {
    let json = body_json(get(test_app(Some("secret")), "/health").await).await;
    assert_eq!(json["auth_enabled"], true);
}

#[tokio::test]
async fn root_describes_server_and_endpoints() {
    let json = body_json(get(test_app(None), "/").await).await;
    assert_eq!(json["name"], "TimeService MCP Server");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["protocol"], "MCP 2024-11-05");
    assert_eq!(json["endpoints"]["sse"], "/sse");
    assert_eq!(json["endpoints"]["health"], "/health (public)");
}

#[tokio::test]
async fn root_marks_protected_endpoints_when_auth_enabled() {
    let json = body_json(get(test_app(Some("secret")), "/").await).await;
    assert_eq!(json["endpoints"]["sse"], "/sse (requires X-API-Key)");
    assert_eq!(json["endpoints"]["tools"], "/tools (requires X-API-Key)");
}

#[tokio::test]
async fn tools_lists_name_description_and_required_params() {
    let json = body_json(get(test_app(None), "/tools").await).await;
    let tools = json["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "get_current_time");
    assert_eq!(tools[0]["required_params"], serde_json::json!([]));
    assert_eq!(tools[1]["name"], "get_time_at_offset");
    assert_eq!(tools[1]["required_params"], serde_json::json!(["offset"]));
    assert_eq!(tools[1]["inputSchema"]["type"], "object");
}

#[tokio::test]
async fn nonexistent_route_returns_404() {
    let response = get(test_app(None), "/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
