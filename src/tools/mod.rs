// tools — built-in tool sets ("profiles") served by the mcp-toolhost binary.
//!
//! Each profile is one independent server: its own tool list, identity and
//! default port. The launcher starts profiles as separate processes.

pub mod echo;
pub mod time;

use std::sync::Arc;

use crate::mcp::tool::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Profile {
    /// Echo / reverse text (protocol smoke testing)
    Echo,
    /// Current time in UTC or at a fixed offset
    Time,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Echo, Profile::Time];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Echo => "echo",
            Profile::Time => "time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Human-readable title shown on `GET /`.
    pub fn title(self) -> &'static str {
        match self {
            Profile::Echo => "Echo MCP Server",
            Profile::Time => "TimeService MCP Server",
        }
    }

    /// `serverInfo.name` reported by `initialize`.
    pub fn server_name(self) -> &'static str {
        match self {
            Profile::Echo => "echo-mcp-server",
            Profile::Time => "time-mcp-server",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Profile::Echo => 8000,
            Profile::Time => 8003,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Profile::Echo => "Echo and reverse text",
            Profile::Time => "Current time in UTC or at a UTC offset",
        }
    }

    pub fn tools(self) -> Vec<Arc<dyn Tool>> {
        match self {
            Profile::Echo => echo::tools(),
            Profile::Time => time::tools(),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
