//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and API keys are available before
//! starting operations that would otherwise fail midway.

use crate::error::{AnirecError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Driving the agent needs both provider keys and the tool launcher.
    Recommend,
    /// The HTTP server drives the agent per request.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Recommend | Operation::Serve => {
            check_api_key("OPENAI_API_KEY")?;
            check_api_key("LINKUP_API_KEY")?;
            check_tool("npx")?;
        }
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
pub fn check_api_key(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(AnirecError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(AnirecError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}

/// Check if an external tool is available on the PATH.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AnirecError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AnirecError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(AnirecError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
