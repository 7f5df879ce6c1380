use axum::http::Method;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use mcp_toolhost::config::Config;
use mcp_toolhost::mcp::SseTransport;
use mcp_toolhost::reaper;
use mcp_toolhost::state::AppState;
use mcp_toolhost::tools::Profile;

/// MCP tool server — JSON-RPC 2.0 over SSE.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Which built-in tool set to serve
    #[arg(long, value_enum, default_value_t = Profile::Echo)]
    profile: Profile,

    /// Override bind host (default: HOST env or 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Override bind port (default: PORT env or the profile's port)
    #[arg(long)]
    port: Option<u16>,

    /// Disable API key authentication even if MCP_API_KEY is set
    #[arg(long)]
    no_auth: bool,
}

fn build_app(state: AppState) -> axum::Router {
    // CORS — any origin, so browser-based MCP clients can connect
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    mcp_toolhost::create_router(state)
        .layer(RequestBodyLimitLayer::new(4 * 1024 * 1024))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    let args = Args::parse();
    let config = Config::from_env(args.profile.default_port())?
        .with_overrides(args.host, args.port, args.no_auth);

    let state = AppState::for_profile(args.profile, &config)?;

    // ── Startup banner ──
    tracing::info!("{} v{}", args.profile.title(), env!("CARGO_PKG_VERSION"));
    tracing::info!("  Address:      {}:{}", config.server.host, config.server.port);
    tracing::info!("  Auth:         {}", if config.auth.enabled() { "enabled" } else { "DISABLED" });
    tracing::info!("  Tools:        {}", state.registry.names().join(", "));
    tracing::info!("  Keepalive:    {}s", config.transport.keepalive.as_secs());
    tracing::info!("  Ordering:     {:?}", config.transport.ordering);

    // ── Optional idle-session eviction ──
    let _reaper = config
        .transport
        .session_idle_timeout
        .map(|ttl| reaper::spawn(state.transport.clone(), ttl));

    let transport = state.transport.clone();
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MCP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(transport))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C / SIGTERM. Open SSE streams are closed first, otherwise
/// they would hold graceful shutdown open indefinitely.
async fn shutdown_signal(transport: SseTransport) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("Shutdown signal received, closing SSE sessions");
    transport.close_all_sessions();
}
