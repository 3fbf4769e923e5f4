//! Configuration inspection command.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::{AnirecError, Result};

/// Run a config subcommand.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(&settings)
                .map_err(|e| AnirecError::Config(e.to_string()))?;
            println!("{}", content);
        }
        ConfigAction::Path => {
            let path = Settings::default_config_path();
            Output::kv("Config path", &path.display().to_string());
            if !path.exists() {
                Output::info("File does not exist yet; defaults are in effect.");
            }
        }
    }
    Ok(())
}
