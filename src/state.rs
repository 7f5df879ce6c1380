// state — shared application state handed to every route handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;

use crate::config::{AuthConfig, Config};
use crate::mcp::protocol::{McpProtocolHandler, ServerInfo};
use crate::mcp::tool::{RegistryError, Tool, ToolRegistry};
use crate::mcp::transport::SseTransport;
use crate::tools::Profile;

/// Central application state. Clone-friendly — everything inside is an `Arc`
/// or already shares its internals.
#[derive(Clone)]
pub struct AppState {
    /// Fixed tool set (also held by the protocol handler).
    pub registry: Arc<ToolRegistry>,
    /// Session table + protocol handler.
    pub transport: SseTransport,
    pub auth: Arc<AuthConfig>,
    /// Display name for `GET /` (e.g. "TimeService MCP Server").
    pub title: String,
    pub server_info: ServerInfo,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        title: &str,
        server_info: ServerInfo,
        tools: Vec<Arc<dyn Tool>>,
        config: &Config,
    ) -> Result<Self, RegistryError> {
        let registry = Arc::new(ToolRegistry::new(tools)?);
        let handler = Arc::new(McpProtocolHandler::new(registry.clone(), server_info.clone()));
        let transport = SseTransport::new(handler)
            .with_keepalive(config.transport.keepalive)
            .with_ordering(config.transport.ordering);

        if config.auth.enabled() {
            tracing::info!("MCP_API_KEY configured — authentication enabled");
        } else {
            tracing::info!("MCP_API_KEY not set or --no-auth — authentication disabled");
        }

        Ok(Self {
            registry,
            transport,
            auth: Arc::new(config.auth.clone()),
            title: title.to_string(),
            server_info,
            start_time: Instant::now(),
        })
    }

    /// State for one of the built-in profiles.
    pub fn for_profile(profile: Profile, config: &Config) -> Result<Self, RegistryError> {
        Self::new(
            profile.title(),
            ServerInfo::new(profile.server_name(), env!("CARGO_PKG_VERSION")),
            profile.tools(),
            config,
        )
    }
}

impl FromRef<AppState> for SseTransport {
    fn from_ref(state: &AppState) -> Self {
        state.transport.clone()
    }
}
