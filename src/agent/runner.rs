//! Agent runner with tool calling, sub-agent fan-out, and handoffs.

use super::tools::{parse_tool_call, ToolContext};
use crate::error::{AnirecError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Declarative description of one agent: who it is and which tools it sees.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ChatCompletionTool>,
}

impl Agent {
    pub fn new(name: &str, model: &str, instructions: &str, tools: Vec<ChatCompletionTool>) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            instructions: instructions.to_string(),
            tools,
        }
    }
}

/// The single seam to the orchestration backend: agent plus input in,
/// free text out. The session never looks past this interface.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, agent: &Agent, input: &str) -> Result<String>;
}

/// Chat-completion backed runtime.
///
/// Drives a tool-calling loop per agent. Sub-agents registered by name can
/// be invoked two ways: as callable tools (their output feeds back into the
/// calling agent's loop, several may run in parallel within one model turn)
/// or through `transfer_to_<name>` handoff tools (the target agent takes
/// over the original input and its output is final).
pub struct Runner {
    client: async_openai::Client<OpenAIConfig>,
    tools: ToolContext,
    agents: HashMap<String, Arc<Agent>>,
    max_iterations: usize,
}

#[async_trait]
impl AgentRuntime for Runner {
    async fn run(&self, agent: &Agent, input: &str) -> Result<String> {
        self.run_agent(agent, input).await
    }
}

impl Runner {
    /// Create a runner over the given tool context and sub-agents.
    pub fn new(
        tools: ToolContext,
        sub_agents: Vec<Arc<Agent>>,
        max_iterations: usize,
        request_timeout: Duration,
    ) -> Self {
        let agents = sub_agents
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect();

        Self {
            client: create_client(request_timeout),
            tools,
            agents,
            max_iterations,
        }
    }

    /// Resolve a handoff tool name to its target agent.
    fn handoff_target(&self, tool_name: &str) -> Option<Arc<Agent>> {
        let target = tool_name.strip_prefix("transfer_to_")?;
        self.agents.get(target).cloned()
    }

    fn run_agent<'a>(&'a self, agent: &'a Agent, input: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let mut messages: Vec<ChatCompletionRequestMessage> = vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(agent.instructions.clone())
                    .build()
                    .map_err(|e| AnirecError::Agent(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(input.to_string())
                    .build()
                    .map_err(|e| AnirecError::Agent(e.to_string()))?
                    .into(),
            ];

            let mut iterations = 0;

            loop {
                iterations += 1;
                if iterations > self.max_iterations {
                    return Err(AnirecError::Agent(format!(
                        "{} exceeded maximum iterations ({})",
                        agent.name, self.max_iterations
                    )));
                }

                debug!("{} iteration {}", agent.name, iterations);

                let request = CreateChatCompletionRequestArgs::default()
                    .model(&agent.model)
                    .messages(messages.clone())
                    .tools(agent.tools.clone())
                    .build()
                    .map_err(|e| AnirecError::Agent(e.to_string()))?;

                let response = self
                    .client
                    .chat()
                    .create(request)
                    .await
                    .map_err(|e| AnirecError::OpenAI(format!("{} API error: {}", agent.name, e)))?;

                let choice = response
                    .choices
                    .first()
                    .ok_or_else(|| AnirecError::Agent("No response from model".to_string()))?;

                let tool_calls = match &choice.message.tool_calls {
                    Some(calls) if !calls.is_empty() => calls.clone(),
                    _ => return Ok(choice.message.content.clone().unwrap_or_default()),
                };

                // A handoff transfers the whole conversation: the target
                // agent runs against the original input and its output is
                // the final answer.
                if let Some(target) = tool_calls
                    .iter()
                    .find_map(|c| self.handoff_target(&c.function.name))
                {
                    info!("{} handing off to {}", agent.name, target.name);
                    return self.run_agent(&target, input).await;
                }

                let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(tool_calls.clone())
                    .build()
                    .map_err(|e| AnirecError::Agent(e.to_string()))?;
                messages.push(assistant_msg.into());

                // All tool calls from one model turn run concurrently; this
                // is how the orchestrator fans out to both sub-agents on an
                // ambiguous query.
                let results = futures::future::join_all(
                    tool_calls.iter().map(|call| self.execute_tool_call(call)),
                )
                .await;

                for (call, result) in tool_calls.iter().zip(results) {
                    let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(&call.id)
                        .content(result)
                        .build()
                        .map_err(|e| AnirecError::Agent(e.to_string()))?;
                    messages.push(tool_msg.into());
                }
            }
        })
    }

    /// Execute one tool call, routing sub-agent tools through the runner
    /// itself. Errors are folded into the result text so the model can
    /// recover instead of the whole run failing.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> String {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Calling tool: {} with args: {}", name, arguments);

        if let Some(sub_agent) = self.agents.get(name).cloned() {
            let input = match sub_agent_input(arguments) {
                Ok(input) => input,
                Err(e) => return format!("Tool error: {}", e),
            };
            return match self.run_agent(&sub_agent, &input).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            };
        }

        match parse_tool_call(name, arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        }
    }
}

/// Extract the `input` argument of a sub-agent tool call.
fn sub_agent_input(arguments: &str) -> Result<String> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| AnirecError::Agent(format!("Invalid tool arguments: {}", e)))?;
    args["input"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| AnirecError::Agent("Missing 'input' argument".to_string()))
}

/// Create an OpenAI client with a bounded request timeout.
fn create_client(timeout: Duration) -> async_openai::Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    async_openai::Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_agent_input_extraction() {
        let input = sub_agent_input(r#"{"input": "anime like Cowboy Bebop"}"#).unwrap();
        assert_eq!(input, "anime like Cowboy Bebop");
    }

    #[test]
    fn test_sub_agent_input_missing() {
        assert!(sub_agent_input("{}").is_err());
    }
}
