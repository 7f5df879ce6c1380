// mcp — Model Context Protocol server core shared by every tool server.
//!
//! - [`tool`]: the `Tool` contract, declarative schemas and the registry
//! - [`protocol`]: JSON-RPC 2.0 envelopes and method dispatch
//! - [`transport`]: SSE sessions pairing a push stream with POSTed requests
//!
//! Protocol: JSON-RPC 2.0 over SSE + HTTP POST.
//! Protocol revision: 2024-11-05 (<https://modelcontextprotocol.io>).

pub mod protocol;
pub mod tool;
pub mod transport;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpProtocolHandler, ServerInfo, MCP_PROTOCOL_VERSION};
pub use tool::{Arguments, DeclarativeTool, Tool, ToolError, ToolParameter, ToolRegistry, ToolResult};
pub use transport::{SseTransport, SubmissionOrdering, TransportError};
