//! HTTP transport layer for the Model Context Protocol
//!
//! Provides the SSE stream (`/sse`) with its message endpoint (`/messages`),
//! the plain JSON-RPC endpoint (`/mcp`), and the public metadata endpoints.

pub mod handlers;
pub mod session;
pub mod sse;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";
pub const MCP_PATH: &str = "/mcp";
