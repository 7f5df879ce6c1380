// launcher — start several tool servers as child processes.
//!
//! Every built-in [`Profile`] is a registered server with a fixed default
//! port. The launcher checks ports, spawns one `mcp-toolhost` process per
//! requested server and tears them all down on Ctrl-C or when any child exits.

use std::net::TcpListener;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::tools::Profile;

pub const SERVER_BINARY: &str = "mcp-toolhost";

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("unknown server '{name}' (available: {available})")]
    UnknownServer { name: String, available: String },

    #[error("port {port} for server '{server}' is already in use")]
    PortInUse { server: Profile, port: u16 },

    #[error("server binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("failed to start '{server}': {source}")]
    Spawn {
        server: Profile,
        #[source]
        source: std::io::Error,
    },

    #[error("no servers selected")]
    NothingToStart,
}

// ── Port utilities ──────────────────────────────────────────────────────────

pub fn is_port_free(host: &str, port: u16) -> bool {
    TcpListener::bind((host, port)).is_ok()
}

/// Availability of every registered server's port, in port order.
pub fn check_ports(host: &str) -> Vec<(Profile, bool)> {
    let mut servers: Vec<Profile> = Profile::ALL.to_vec();
    servers.sort_by_key(|p| p.default_port());
    servers
        .into_iter()
        .map(|p| (p, is_port_free(host, p.default_port())))
        .collect()
}

pub fn next_free_port(host: &str, range: RangeInclusive<u16>) -> Option<u16> {
    range.into_iter().find(|&port| is_port_free(host, port))
}

// ── Registry helpers ────────────────────────────────────────────────────────

/// Resolve server names, dropping duplicates but keeping first-seen order.
pub fn validate_servers(names: &[String]) -> Result<Vec<Profile>, LauncherError> {
    let mut selected = Vec::new();
    for name in names {
        let profile = Profile::from_name(name).ok_or_else(|| LauncherError::UnknownServer {
            name: name.clone(),
            available: Profile::ALL.map(|p| p.name()).join(", "),
        })?;
        if !selected.contains(&profile) {
            selected.push(profile);
        }
    }
    Ok(selected)
}

pub fn ensure_ports_free(host: &str, servers: &[Profile]) -> Result<(), LauncherError> {
    match servers.iter().find(|p| !is_port_free(host, p.default_port())) {
        Some(&server) => Err(LauncherError::PortInUse { server, port: server.default_port() }),
        None => Ok(()),
    }
}

/// Printable table of registered servers and their port status.
pub fn registry_table(host: &str) -> String {
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);
    let mut out = vec![
        String::new(),
        "Registered MCP Servers:".to_string(),
        rule,
        format!("{:<12} {:<8} {:<10} Description", "Name", "Port", "Status"),
        thin.clone(),
    ];
    for (profile, free) in check_ports(host) {
        out.push(format!(
            "{:<12} {:<8} {:<10} {}",
            profile.name(),
            profile.default_port(),
            if free { "free" } else { "IN USE" },
            profile.description()
        ));
    }
    out.push(thin);
    out.push(format!("Total: {} servers", Profile::ALL.len()));
    out.join("\n")
}

// ── Process management ──────────────────────────────────────────────────────

/// The server executable that sits next to the running launcher.
pub fn server_binary() -> Result<PathBuf, LauncherError> {
    let exe = std::env::current_exe().map_err(|_| LauncherError::BinaryNotFound(PathBuf::from(SERVER_BINARY)))?;
    let candidate = exe
        .parent()
        .map(|dir| dir.join(format!("{}{}", SERVER_BINARY, std::env::consts::EXE_SUFFIX)))
        .unwrap_or_else(|| PathBuf::from(SERVER_BINARY));
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(LauncherError::BinaryNotFound(candidate))
    }
}

pub fn server_args(server: Profile, no_auth: bool) -> Vec<String> {
    let mut args = vec![
        "--profile".to_string(),
        server.name().to_string(),
        "--port".to_string(),
        server.default_port().to_string(),
    ];
    if no_auth {
        args.push("--no-auth".to_string());
    }
    args
}

/// Spawn every server and supervise them until Ctrl-C or the first exit.
pub async fn run(binary: PathBuf, servers: &[Profile], no_auth: bool) -> Result<(), LauncherError> {
    if servers.is_empty() {
        return Err(LauncherError::NothingToStart);
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut children: JoinSet<(Profile, std::io::Result<ExitStatus>)> = JoinSet::new();

    for &server in servers {
        let mut child = Command::new(&binary)
            .args(server_args(server, no_auth))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LauncherError::Spawn { server, source })?;
        tracing::info!("launcher: started {} on port {} (pid {:?})", server, server.default_port(), child.id());

        let mut stop = stop_rx.clone();
        children.spawn(async move {
            tokio::select! {
                status = child.wait() => (server, status),
                _ = stop.changed() => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("launcher: failed to stop {}: {}", server, e);
                    }
                    (server, child.wait().await)
                }
            }
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("launcher: Ctrl-C received, stopping servers"),
        Some(joined) = children.join_next() => {
            if let Ok((server, status)) = joined {
                tracing::warn!("launcher: {} exited early ({:?}), stopping the rest", server, status);
            }
        }
    }

    let _ = stop_tx.send(true);
    while let Some(joined) = children.join_next().await {
        if let Ok((server, status)) = joined {
            tracing::info!("launcher: {} stopped ({:?})", server, status);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_servers_resolves_and_dedups() {
        let names = vec!["time".to_string(), "echo".to_string(), "time".to_string()];
        assert_eq!(validate_servers(&names).unwrap(), vec![Profile::Time, Profile::Echo]);
    }

    #[test]
    fn validate_servers_rejects_unknown_names() {
        let err = validate_servers(&["weather".to_string()]).unwrap_err();
        assert!(matches!(err, LauncherError::UnknownServer { ref name, .. } if name == "weather"));
        assert!(err.to_string().contains("echo, time"));
    }

    #[test]
    fn occupied_port_is_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_free("127.0.0.1", port));
        drop(listener);
        assert!(is_port_free("127.0.0.1", port));
    }

    #[test]
    fn next_free_port_skips_occupied() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert_eq!(next_free_port("127.0.0.1", port..=port), None);
    }

    #[test]
    fn server_args_carry_profile_and_port() {
        assert_eq!(server_args(Profile::Time, true), ["--profile", "time", "--port", "8003", "--no-auth"]);
        assert_eq!(server_args(Profile::Echo, false), ["--profile", "echo", "--port", "8000"]);
    }

    #[test]
    fn registry_table_lists_every_server() {
        let table = registry_table("127.0.0.1");
        for profile in Profile::ALL {
            assert!(table.contains(profile.name()));
        }
        assert!(table.contains("Total: 2 servers"));
    }

    #[tokio::test]
    async fn run_with_nothing_selected_fails() {
        let err = run(PathBuf::from(SERVER_BINARY), &[], false).await.unwrap_err();
        assert!(matches!(err, LauncherError::NothingToStart));
    }
}
