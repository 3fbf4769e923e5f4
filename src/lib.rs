//! Anirec - Conversational Anime Recommendations
//!
//! A chat bot that recommends anime by combining AniList structured data
//! with live web search, orchestrated through an LLM agent hierarchy.
//!
//! # Overview
//!
//! Anirec lets you:
//! - Chat with an agent that understands your anime preferences
//! - Get scored recommendations backed by AniList and web search
//! - Enrich recommendations with cover images and descriptions
//! - Serve the whole flow over a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and agent prompts
//! - `tags` - Local AniList tag catalog snapshot
//! - `anilist` - AniList GraphQL gateway
//! - `search` - Web search gateway
//! - `mcp` - Stdio client for the AniList tool subprocess
//! - `agent` - Agent hierarchy and tool-calling runtime
//! - `session` - Conversation session with history and preferences
//! - `enrich` - Title extraction and per-title detail lookup
//! - `server` - HTTP front door
//!
//! # Example
//!
//! ```rust,no_run
//! use anirec::config::Settings;
//! use anirec::session::ChatSession;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut session = ChatSession::new(settings)?;
//!
//!     session.start().await?;
//!     let reply = session.get_recommendation("anime like Cowboy Bebop").await?;
//!     println!("{}", reply);
//!     session.stop().await;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod anilist;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod mcp;
pub mod search;
pub mod server;
pub mod session;
pub mod tags;

pub use error::{AnirecError, Result};
