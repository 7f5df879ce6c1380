//! mcp-launcher — list, check and start the registered MCP tool servers.
//!
//! ```text
//! mcp-launcher                  # list servers and port status
//! mcp-launcher --check          # only report which ports are in use
//! mcp-launcher time             # start one server
//! mcp-launcher echo time        # start several
//! mcp-launcher --all --no-auth  # start everything without auth
//! ```
//!
//! Children inherit the environment, so `MCP_API_KEY` applies to all of them.

use clap::Parser;

use mcp_toolhost::launcher;
use mcp_toolhost::tools::Profile;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Servers to start (see the list printed without arguments)
    servers: Vec<String>,

    /// Start every registered server
    #[arg(long, conflicts_with = "servers")]
    all: bool,

    /// Start servers without API key authentication
    #[arg(long)]
    no_auth: bool,

    /// Report which registered ports are in use, then exit
    #[arg(long)]
    check: bool,

    /// Host used for port checks
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    if args.check {
        for (profile, free) in launcher::check_ports(&args.host) {
            println!(
                "{:<12} {:<6} {}",
                profile.name(),
                profile.default_port(),
                if free { "free" } else { "IN USE" }
            );
        }
        return Ok(());
    }

    let servers = if args.all {
        Profile::ALL.to_vec()
    } else if args.servers.is_empty() {
        println!("{}", launcher::registry_table(&args.host));
        println!("\nUsage: mcp-launcher <name>... | --all [--no-auth]");
        return Ok(());
    } else {
        launcher::validate_servers(&args.servers)?
    };

    launcher::ensure_ports_free(&args.host, &servers)?;
    let binary = launcher::server_binary()?;

    if args.no_auth {
        tracing::warn!("launcher: starting servers with authentication DISABLED");
    } else if std::env::var("MCP_API_KEY").map(|k| k.is_empty()).unwrap_or(true) {
        tracing::warn!("launcher: MCP_API_KEY not set, servers will run without authentication");
    }

    launcher::run(binary, &servers, args.no_auth).await?;
    Ok(())
}
