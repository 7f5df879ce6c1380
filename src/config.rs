// config — server configuration from environment variables + CLI overrides.
//
// Environment:
//   HOST                            bind address (default 0.0.0.0)
//   PORT                            bind port (default: the profile's port)
//   MCP_API_KEY                     shared key; enables the auth gate when non-empty
//   MCP_PUBLIC_TOOLS                expose GET /tools without a key (default false)
//   MCP_KEEPALIVE_SECS              idle SSE keepalive interval (default 30)
//   MCP_SERIALIZE_SUBMISSIONS       process one submission per session at a time (default false)
//   MCP_SESSION_IDLE_TIMEOUT_SECS   evict sessions idle this long (default: never)

use std::time::Duration;

use crate::mcp::transport::{DEFAULT_KEEPALIVE, SubmissionOrdering};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be a boolean (true/false), got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthConfig {
    /// Shared secret. `None` disables the gate entirely.
    pub api_key: Option<String>,
    /// Whether `/tools` is reachable without a key.
    pub public_tools: bool,
}

impl AuthConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub keepalive: Duration,
    pub ordering: SubmissionOrdering,
    pub session_idle_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keepalive: DEFAULT_KEEPALIVE,
            ordering: SubmissionOrdering::Concurrent,
            session_idle_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub transport: TransportConfig,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        Self::from_lookup(default_port, |var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source (used by tests).
    pub fn from_lookup<F>(default_port: u16, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(raw) => parse_port("PORT", &raw)?,
            None => default_port,
        };

        let api_key = lookup("MCP_API_KEY").filter(|k| !k.is_empty());
        let public_tools = parse_bool("MCP_PUBLIC_TOOLS", lookup("MCP_PUBLIC_TOOLS"))?;

        let keepalive = match lookup("MCP_KEEPALIVE_SECS") {
            Some(raw) => parse_secs("MCP_KEEPALIVE_SECS", &raw)?,
            None => DEFAULT_KEEPALIVE,
        };
        let ordering = if parse_bool("MCP_SERIALIZE_SUBMISSIONS", lookup("MCP_SERIALIZE_SUBMISSIONS"))? {
            SubmissionOrdering::Serialized
        } else {
            SubmissionOrdering::Concurrent
        };
        let session_idle_timeout = lookup("MCP_SESSION_IDLE_TIMEOUT_SECS")
            .map(|raw| parse_secs("MCP_SESSION_IDLE_TIMEOUT_SECS", &raw))
            .transpose()?;

        Ok(Self {
            server: ServerConfig { host, port },
            auth: AuthConfig { api_key, public_tools },
            transport: TransportConfig { keepalive, ordering, session_idle_timeout },
        })
    }

    /// Apply command-line overrides. `no_auth` always wins over `MCP_API_KEY`.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>, no_auth: bool) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if no_auth {
            self.auth.api_key = None;
        }
        self
    }
}

fn parse_port(var: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ConfigError::InvalidNumber { var, value: raw.to_string() })
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidNumber { var, value: raw.to_string() })
}

fn parse_bool(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else { return Ok(false) };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { var, value: raw }),
    }
}
