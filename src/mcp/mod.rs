//! Stdio client for the external AniList tool server.
//!
//! The server is an external command-line process speaking JSON-RPC 2.0
//! over standard I/O. Its tools are treated as opaque capabilities and
//! forwarded to the agent runtime.

mod client;
pub mod protocol;

pub use client::McpClient;
pub use protocol::Tool;
