//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC over stdio or HTTP for AI tool integration.

pub mod handler;
pub mod http;
pub mod protocol;
pub mod resources;
pub mod tools;

pub use handler::PulseHandler;
pub use protocol::{
    dispatch, methods, InitializeResult, McpHandler, McpRequest, McpResponse, McpServer,
    ToolCallResult,
};
pub use tools::get_tool_definitions;
