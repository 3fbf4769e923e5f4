//! Tool definitions and implementations for the agent hierarchy.

use crate::anilist;
use crate::error::{AnirecError, Result};
use crate::mcp::McpClient;
use crate::search::SearchClient;
use crate::tags::TagCatalog;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde_json::Value;
use std::sync::Arc;

/// A tool invocation requested by the model.
///
/// Unknown names are forwarded to the tool server rather than rejected;
/// the server's own error text flows back to the model.
#[derive(Debug, Clone)]
pub enum ToolCall {
    /// Return the permitted tag list from the local catalog.
    GetTags,

    /// Fetch the normalized detail record for an AniList media id.
    GetAnimeDetail { id: i64 },

    /// Run a web search and return the formatted digest.
    SearchWeb { query: String },

    /// Forward a call to the AniList tool subprocess.
    Remote { name: String, arguments: Value },
}

/// Tool execution context shared by every agent in the hierarchy.
pub struct ToolContext {
    pub tags: Arc<TagCatalog>,
    pub http: reqwest::Client,
    pub search: Arc<SearchClient>,
    pub mcp: Arc<McpClient>,
}

impl ToolContext {
    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::GetTags => Ok(serde_json::to_string(self.tags.names())?),
            ToolCall::GetAnimeDetail { id } => {
                let detail = anilist::fetch_anime_detail(&self.http, *id).await?;
                Ok(serde_json::to_string(&detail)?)
            }
            ToolCall::SearchWeb { query } => self.search.search(query).await,
            ToolCall::Remote { name, arguments } => {
                self.mcp.call_tool(name, arguments.clone()).await
            }
        }
    }
}

/// Parse a tool call from the model's function-call format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: Value = if arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| AnirecError::Agent(format!("Invalid tool arguments: {}", e)))?
    };

    match name {
        "get_tags" => Ok(ToolCall::GetTags),
        "get_anime_detail" => {
            let id = args["id"]
                .as_i64()
                .ok_or_else(|| AnirecError::Agent("Missing 'id' argument".to_string()))?;
            Ok(ToolCall::GetAnimeDetail { id })
        }
        "search_web" => {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| AnirecError::Agent("Missing 'query' argument".to_string()))?
                .to_string();
            Ok(ToolCall::SearchWeb { query })
        }
        _ => Ok(ToolCall::Remote {
            name: name.to_string(),
            arguments: args,
        }),
    }
}

fn function_tool(name: &str, description: &str, parameters: Value) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

/// Native tool definitions for the AniList agent.
pub fn native_tool_definitions() -> Vec<ChatCompletionTool> {
    vec![
        function_tool(
            "get_tags",
            "Retrieve the curated list of AniList tag names. \
            Use this before filtering by tag, and only use tags it returns.",
            serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        ),
        function_tool(
            "get_anime_detail",
            "Retrieve detailed information about a specific anime by AniList id: \
            title, description, start date, genres, tags, episode count, and \
            the top rated recommendations for it.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "The AniList media id"
                    }
                },
                "required": ["id"]
            }),
        ),
    ]
}

/// Tool definition for the web search agent.
pub fn search_tool_definition() -> ChatCompletionTool {
    function_tool(
        "search_web",
        "Search the web and return a digest of the top results. \
        Use this for niche or trend-dependent anime queries.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        }),
    )
}

/// Convert a tool advertised by the subprocess into a model tool definition.
pub fn remote_tool_definition(tool: &crate::mcp::Tool) -> ChatCompletionTool {
    let parameters = if tool.input_schema.is_object() {
        tool.input_schema.clone()
    } else {
        serde_json::json!({ "type": "object", "properties": {} })
    };

    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            parameters: Some(parameters),
            strict: None,
        },
    }
}

/// Expose a sub-agent as a callable tool taking a single input string.
pub fn agent_tool(name: &str, description: &str) -> ChatCompletionTool {
    function_tool(
        name,
        description,
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The request to forward to this agent"
                }
            },
            "required": ["input"]
        }),
    )
}

/// Handoff tool: transfers the whole conversation to the named agent.
pub fn handoff_tool(agent_name: &str, description: &str) -> ChatCompletionTool {
    function_tool(
        &format!("transfer_to_{}", agent_name),
        description,
        serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_anime_detail() {
        let tool = parse_tool_call("get_anime_detail", r#"{"id": 1}"#).unwrap();
        match tool {
            ToolCall::GetAnimeDetail { id } => assert_eq!(id, 1),
            _ => panic!("Expected GetAnimeDetail tool"),
        }
    }

    #[test]
    fn test_parse_search_web_requires_query() {
        let err = parse_tool_call("search_web", "{}").unwrap_err();
        assert!(matches!(err, AnirecError::Agent(_)));
    }

    #[test]
    fn test_parse_get_tags_ignores_arguments() {
        let tool = parse_tool_call("get_tags", "").unwrap();
        assert!(matches!(tool, ToolCall::GetTags));
    }

    #[test]
    fn test_unknown_tool_becomes_remote() {
        let tool = parse_tool_call("search_anime", r#"{"genres":["Action"]}"#).unwrap();
        match tool {
            ToolCall::Remote { name, arguments } => {
                assert_eq!(name, "search_anime");
                assert_eq!(arguments["genres"][0], "Action");
            }
            _ => panic!("Expected Remote tool"),
        }
    }

    #[test]
    fn test_handoff_tool_name_prefix() {
        let tool = handoff_tool("web_search_agent", "Hand off niche queries.");
        assert_eq!(tool.function.name, "transfer_to_web_search_agent");
    }
}
