// auth — optional shared-key gate.
// If MCP_API_KEY is set, every route outside the public allow-list requires
// the key in the `X-API-Key` header or the `api_key` query parameter.
// If it is not set (or --no-auth is given), the gate is disabled.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY: &str = "api_key";

/// Paths reachable without a key even when auth is enabled.
pub const PUBLIC_PATHS: &[&str] = &["/health", "/", "/docs", "/redoc", "/openapi.json"];

pub fn is_public_path(path: &str, public_tools: bool) -> bool {
    PUBLIC_PATHS.contains(&path) || (public_tools && path == "/tools")
}

/// Exact, constant-time comparison of a presented key against the secret.
pub fn keys_match(presented: &str, secret: &str) -> bool {
    presented.as_bytes().ct_eq(secret.as_bytes()).into()
}

/// Pull the key from the header first, then from the query string.
fn presented_key(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(mut params)| params.remove(API_KEY_QUERY))
            .filter(|v| !v.is_empty())
    })
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized: missing or invalid X-API-Key header" })),
    )
        .into_response()
}

/// Middleware that enforces the shared key when one is configured.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let secret = match state.auth.api_key.as_deref() {
        Some(s) => s,
        None => return next.run(request).await,
    };

    if is_public_path(request.uri().path(), state.auth.public_tools) {
        return next.run(request).await;
    }

    match presented_key(&request) {
        Some(key) if keys_match(&key, secret) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Auth failed: invalid API key");
            unauthorized()
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Auth failed: missing API key");
            unauthorized()
        }
    }
}
