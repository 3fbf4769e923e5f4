//! Agent hierarchy and tool-calling runtime.

mod runner;
mod tools;

pub use runner::{Agent, AgentRuntime, Runner};
pub use tools::{
    agent_tool, handoff_tool, native_tool_definitions, parse_tool_call, remote_tool_definition,
    search_tool_definition, ToolCall, ToolContext,
};
