pub mod auth;
pub mod config;
pub mod handlers;
pub mod launcher;
pub mod mcp;
pub mod reaper;
pub mod state;
pub mod tools;

use axum::Router;
use axum::middleware;
use axum::routing::get;

use state::AppState;

pub use handlers::ApiDoc;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // MCP transport: GET /sse + POST /message
        .merge(mcp::transport::routes::<AppState>())
        // Operability
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/tools", get(handlers::list_tools))
        .route("/openapi.json", get(handlers::openapi_json))
        // Shared-key gate (no-op when auth is disabled)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key))
        .with_state(state)
}
