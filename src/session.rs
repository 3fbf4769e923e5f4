//! Conversation session: subprocess lifecycle, history, and preferences.
//!
//! One session owns one tool subprocess and one configured agent hierarchy
//! at a time, and mediates every user turn. Lifecycle is start -> (many)
//! get_recommendation -> stop.

use crate::agent::{
    agent_tool, handoff_tool, native_tool_definitions, remote_tool_definition,
    search_tool_definition, Agent, AgentRuntime, Runner, ToolContext,
};
use crate::cli::preflight;
use crate::config::{Prompts, Settings};
use crate::error::{AnirecError, Result};
use crate::mcp::McpClient;
use crate::search::SearchClient;
use crate::tags::TagCatalog;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Timeout for AniList gateway calls made from agent tools.
const GATEWAY_TIMEOUT_SECS: u64 = 30;

/// One completed user/bot turn.
#[derive(Debug, Clone)]
pub struct ConversationExchange {
    pub user: String,
    pub bot: String,
    pub timestamp: DateTime<Utc>,
}

/// Genre vocabulary matched by the preference heuristic.
const GENRES: [&str; 9] = [
    "action",
    "romance",
    "comedy",
    "drama",
    "fantasy",
    "sci-fi",
    "thriller",
    "horror",
    "slice of life",
];

const POSITIVE_WORDS: [&str; 3] = ["like", "love", "enjoy"];
const NEGATIVE_WORDS: [&str; 3] = ["hate", "dislike", "don't like"];

struct AgentHandle {
    orchestrator: Agent,
    runtime: Box<dyn AgentRuntime>,
}

/// Stateful chat bot session.
pub struct ChatSession {
    settings: Settings,
    prompts: Prompts,
    tags: Arc<TagCatalog>,
    agent: Option<AgentHandle>,
    server: Option<Arc<McpClient>>,
    history: Vec<ConversationExchange>,
    preferences: BTreeMap<String, bool>,
}

impl ChatSession {
    /// Create a stopped session. Loads the tag catalog and prompts up
    /// front; a missing or malformed tag snapshot fails construction.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.agent.prompts_dir.as_deref())?;
        let tags = Arc::new(TagCatalog::load(&settings.tags_path())?);
        info!("Loaded {} permitted tags", tags.len());

        Ok(Self {
            settings,
            prompts,
            tags,
            agent: None,
            server: None,
            history: Vec::new(),
            preferences: BTreeMap::new(),
        })
    }

    /// Whether the session has a live agent hierarchy.
    pub fn is_started(&self) -> bool {
        self.agent.is_some()
    }

    /// Start the session: spawn the tool subprocess and build the agents.
    ///
    /// All-or-nothing: if anything fails after the subprocess is spawned,
    /// the subprocess is closed before the error propagates. Starting an
    /// already started session is an error.
    pub async fn start(&mut self) -> Result<()> {
        if self.agent.is_some() {
            return Err(AnirecError::Session(
                "session already started; call stop() first".to_string(),
            ));
        }

        // The launcher must exist before any subprocess or network action.
        preflight::check_tool(&self.settings.mcp.command)?;

        let mcp = Arc::new(
            McpClient::spawn(
                &self.settings.mcp.command,
                &self.settings.mcp.args,
                Duration::from_secs(self.settings.mcp.request_timeout_secs),
            )
            .await?,
        );

        match self.build_agents(Arc::clone(&mcp)).await {
            Ok(handle) => {
                self.agent = Some(handle);
                self.server = Some(mcp);
                Ok(())
            }
            Err(e) => {
                mcp.shutdown().await;
                Err(e)
            }
        }
    }

    /// Stop the session. Idempotent; never fails.
    pub async fn stop(&mut self) {
        if let Some(mcp) = self.server.take() {
            mcp.shutdown().await;
        }
        if self.agent.take().is_some() {
            debug!("Session stopped");
        }
    }

    /// Run one user turn through the orchestrator.
    ///
    /// Upstream failures during the run degrade to a user-facing apology
    /// string so the conversation survives; only calling before `start`
    /// is an error.
    pub async fn get_recommendation(&mut self, user_input: &str) -> Result<String> {
        let context = self.build_context(user_input);

        let result = {
            let handle = self.agent.as_ref().ok_or_else(|| {
                AnirecError::Session(
                    "session not initialized; call start() first".to_string(),
                )
            })?;

            let trace_id = Uuid::new_v4();
            info!(%trace_id, "Processing request");
            handle.runtime.run(&handle.orchestrator, &context).await
        };

        match result {
            Ok(reply) => {
                // History stores the original user text, not the augmented
                // context it was wrapped in.
                self.history.push(ConversationExchange {
                    user: user_input.to_string(),
                    bot: reply.clone(),
                    timestamp: Utc::now(),
                });
                self.extract_preferences(user_input);
                Ok(reply)
            }
            Err(e) => {
                warn!("Agent run failed: {}", e);
                Ok(format!(
                    "Sorry, something went wrong while looking for recommendations: {}",
                    e
                ))
            }
        }
    }

    /// Clear history and learned preferences. Lifecycle is untouched.
    pub fn reset(&mut self) {
        self.history.clear();
        self.preferences.clear();
    }

    /// Full unclipped conversation history.
    pub fn history(&self) -> &[ConversationExchange] {
        &self.history
    }

    /// Learned preference set.
    pub fn preferences(&self) -> &BTreeMap<String, bool> {
        &self.preferences
    }

    async fn build_agents(&self, mcp: Arc<McpClient>) -> Result<AgentHandle> {
        mcp.initialize().await?;
        let remote_tools = mcp.list_tools().await?;
        info!(
            "Tool server started with tools: {:?}",
            remote_tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
        );

        let search = Arc::new(SearchClient::from_env(&self.settings.search)?);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()?;

        let model = &self.settings.agent.model;

        let mut anilist_tools = native_tool_definitions();
        anilist_tools.extend(remote_tools.iter().map(remote_tool_definition));
        let anilist_agent = Arc::new(Agent::new(
            "anilist_agent",
            model,
            &self.prompts.anilist_agent,
            anilist_tools,
        ));

        let web_agent = Arc::new(Agent::new(
            "web_search_agent",
            model,
            &self.prompts.web_agent,
            vec![search_tool_definition()],
        ));

        let orchestrator = Agent::new(
            "orchestrator",
            model,
            &self.prompts.orchestrator,
            vec![
                agent_tool(
                    "anilist_agent",
                    "Recommends anime using AniList structured data.",
                ),
                agent_tool(
                    "web_search_agent",
                    "Searches the web for anime recommendations.",
                ),
                handoff_tool(
                    "anilist_agent",
                    "Hand off general or popular anime recommendation queries.",
                ),
                handoff_tool(
                    "web_search_agent",
                    "Hand off unusually specific or niche queries.",
                ),
            ],
        );

        let tools = ToolContext {
            tags: Arc::clone(&self.tags),
            http,
            search,
            mcp,
        };

        let runner = Runner::new(
            tools,
            vec![anilist_agent, web_agent],
            self.settings.agent.max_iterations,
            Duration::from_secs(self.settings.agent.request_timeout_secs),
        );

        Ok(AgentHandle {
            orchestrator,
            runtime: Box::new(runner),
        })
    }

    /// Assemble the context string for one turn: recent history, learned
    /// preferences, then the current request, each in a labeled block.
    fn build_context(&self, current_input: &str) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.history.is_empty() {
            parts.push("CONVERSATION HISTORY:".to_string());
            let start = self.history.len().saturating_sub(3);
            for exchange in &self.history[start..] {
                parts.push(format!("User: {}", exchange.user));
                parts.push(format!("Bot: {}", exchange.bot));
            }
        }

        if !self.preferences.is_empty() {
            parts.push("USER PREFERENCES:".to_string());
            for (key, value) in &self.preferences {
                parts.push(format!("- {}: {}", key, value));
            }
        }

        parts.push(format!("CURRENT REQUEST: {}", current_input));
        parts.join("\n")
    }

    /// Merge preference deltas inferred from the latest user text.
    /// Keys are added or overwritten, never removed.
    fn extract_preferences(&mut self, user_input: &str) {
        let lower = user_input.to_lowercase();

        for clause in split_clauses(&lower) {
            for genre in GENRES {
                if !clause.contains(genre) {
                    continue;
                }
                // Positive wins when a clause carries both sentiments.
                if has_positive_sentiment(&clause) {
                    self.preferences.insert(format!("likes_{}", genre), true);
                } else if has_negative_sentiment(&clause) {
                    self.preferences.insert(format!("dislikes_{}", genre), true);
                }
            }
        }

        if lower.contains("short") || lower.contains("few episodes") {
            self.preferences.insert("prefers_short_series".to_string(), true);
        } else if lower.contains("long") || lower.contains("many episodes") {
            self.preferences.insert("prefers_long_series".to_string(), true);
        }

        if lower.contains("subtitles") || lower.contains("sub") {
            self.preferences.insert("prefers_subtitles".to_string(), true);
        } else if lower.contains("dub") || lower.contains("english") {
            self.preferences.insert("prefers_dubbed".to_string(), true);
        }
    }

    #[cfg(test)]
    fn attach_runtime(&mut self, runtime: Box<dyn AgentRuntime>) {
        self.agent = Some(AgentHandle {
            orchestrator: Agent::new("orchestrator", "test-model", "test", Vec::new()),
            runtime,
        });
    }
}

/// Split lowercased text into sentiment clauses so that "love action but
/// hate horror" attributes each feeling to its own genre.
fn split_clauses(text: &str) -> Vec<String> {
    text.replace(" but ", ".")
        .split(['.', ',', ';', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Negation phrases are masked first so "don't like" never reads as "like".
fn has_positive_sentiment(clause: &str) -> bool {
    let masked = clause.replace("don't like", "").replace("dislike", "");
    POSITIVE_WORDS.iter().any(|w| masked.contains(w))
}

fn has_negative_sentiment(clause: &str) -> bool {
    NEGATIVE_WORDS.iter().any(|w| clause.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedRuntime {
        reply: std::result::Result<String, String>,
    }

    #[async_trait]
    impl AgentRuntime for FixedRuntime {
        async fn run(&self, _agent: &Agent, _input: &str) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(AnirecError::Agent(message.clone())),
            }
        }
    }

    fn test_session() -> ChatSession {
        // Bypass `new` so tests need no tag snapshot on disk.
        ChatSession {
            settings: Settings::default(),
            prompts: Prompts::default(),
            tags: Arc::new(test_catalog()),
            agent: None,
            server: None,
            history: Vec::new(),
            preferences: BTreeMap::new(),
        }
    }

    fn test_catalog() -> TagCatalog {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"data":{"MediaTagCollection":[{"name":"Space"}]}}"#)
            .unwrap();
        TagCatalog::load(file.path()).unwrap()
    }

    fn extract(input: &str) -> BTreeMap<String, bool> {
        let mut session = test_session();
        session.extract_preferences(input);
        session.preferences
    }

    #[test]
    fn test_likes_and_dislikes_in_one_sentence() {
        let prefs = extract("I love action but hate horror");
        assert_eq!(prefs.get("likes_action"), Some(&true));
        assert_eq!(prefs.get("dislikes_horror"), Some(&true));
        assert!(!prefs.contains_key("likes_horror"));
    }

    #[test]
    fn test_dont_like_is_a_dislike() {
        let prefs = extract("I don't like romance");
        assert_eq!(prefs.get("dislikes_romance"), Some(&true));
        assert!(!prefs.contains_key("likes_romance"));
    }

    #[test]
    fn test_likes_wins_when_both_sentiments_share_a_clause() {
        let prefs = extract("I like and hate drama");
        assert_eq!(prefs.get("likes_drama"), Some(&true));
        assert!(!prefs.contains_key("dislikes_drama"));
    }

    #[test]
    fn test_series_length_is_mutually_exclusive() {
        let prefs = extract("something short please");
        assert_eq!(prefs.get("prefers_short_series"), Some(&true));
        assert!(!prefs.contains_key("prefers_long_series"));

        let prefs = extract("a long epic with many episodes");
        assert_eq!(prefs.get("prefers_long_series"), Some(&true));
    }

    #[test]
    fn test_sub_beats_dub_when_both_present() {
        let prefs = extract("sub or dub, either works");
        assert_eq!(prefs.get("prefers_subtitles"), Some(&true));
        assert!(!prefs.contains_key("prefers_dubbed"));
    }

    #[test]
    fn test_preferences_accumulate_across_turns() {
        let mut session = test_session();
        session.extract_preferences("I love action");
        session.extract_preferences("I enjoy comedy too");
        assert_eq!(session.preferences.len(), 2);
    }

    #[test]
    fn test_context_clips_history_to_last_three() {
        let mut session = test_session();
        for i in 0..5 {
            session.history.push(ConversationExchange {
                user: format!("question {}", i),
                bot: format!("answer {}", i),
                timestamp: Utc::now(),
            });
        }

        let context = session.build_context("next");
        assert!(!context.contains("question 0"));
        assert!(!context.contains("question 1"));
        assert!(context.contains("User: question 2"));
        assert!(context.contains("Bot: answer 4"));
        assert!(context.ends_with("CURRENT REQUEST: next"));

        // Full history is still retained for inspection and reset.
        assert_eq!(session.history().len(), 5);
    }

    #[test]
    fn test_context_skips_empty_sections() {
        let session = test_session();
        let context = session.build_context("hello");
        assert_eq!(context, "CURRENT REQUEST: hello");
    }

    #[test]
    fn test_context_includes_preferences_as_key_value_lines() {
        let mut session = test_session();
        session.preferences.insert("likes_action".to_string(), true);
        let context = session.build_context("more like that");
        assert!(context.contains("USER PREFERENCES:\n- likes_action: true"));
    }

    #[tokio::test]
    async fn test_get_recommendation_before_start_fails() {
        let mut session = test_session();
        let err = session.get_recommendation("anything").await.unwrap_err();
        assert!(matches!(err, AnirecError::Session(_)));
    }

    #[tokio::test]
    async fn test_stop_on_never_started_session_is_fine() {
        let mut session = test_session();
        session.stop().await;
        session.stop().await;
        assert!(!session.is_started());
    }

    #[tokio::test]
    async fn test_successful_turn_appends_history_and_preferences() {
        let mut session = test_session();
        session.attach_runtime(Box::new(FixedRuntime {
            reply: Ok("1. **Cowboy Bebop** - 9/10".to_string()),
        }));

        let reply = session.get_recommendation("I love action").await.unwrap();
        assert!(reply.contains("Cowboy Bebop"));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].user, "I love action");
        assert_eq!(session.preferences().get("likes_action"), Some(&true));
    }

    #[tokio::test]
    async fn test_failed_turn_degrades_to_apology_without_history() {
        let mut session = test_session();
        session.attach_runtime(Box::new(FixedRuntime {
            reply: Err("model unavailable".to_string()),
        }));

        let reply = session.get_recommendation("hi").await.unwrap();
        assert!(reply.starts_with("Sorry"));
        assert!(session.history().is_empty());
        assert!(session.preferences().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_context_only() {
        let mut session = test_session();
        session.attach_runtime(Box::new(FixedRuntime {
            reply: Ok("ok".to_string()),
        }));
        session.get_recommendation("I love action").await.unwrap();

        session.reset();
        assert!(session.history().is_empty());
        assert!(session.preferences().is_empty());
        assert!(session.is_started());
    }
}
