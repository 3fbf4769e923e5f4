//! Configuration module for Anirec.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    AgentSettings, GeneralSettings, HttpSettings, McpSettings, SearchSettings, Settings,
};
