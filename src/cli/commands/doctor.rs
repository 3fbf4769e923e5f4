//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::tags::TagCatalog;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    hint: Option<String>,
}

#[derive(Debug, PartialEq)]
enum CheckStatus {
    Ok,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Anirec Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    checks.push(check_tool(
        "npx",
        "Install Node.js from https://nodejs.org (npx ships with it)",
    ));
    checks.push(check_tool(
        "node",
        "Install Node.js from https://nodejs.org",
    ));
    for check in &checks {
        check.print();
    }

    println!("\n{}", style("API Keys").bold());
    let key_checks = [
        check_env_key("OPENAI_API_KEY", "export OPENAI_API_KEY='sk-...'"),
        check_env_key("LINKUP_API_KEY", "export LINKUP_API_KEY='...'"),
    ];
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!("\n{}", style("Configuration").bold());
    let config_checks = [check_tag_snapshot(settings), check_config_file()];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();
    let errors = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Error)
        .count();

    if errors == 0 {
        Output::success("All checks passed. You're ready to go.");
    } else {
        Output::error(&format!("{} check(s) failed.", errors));
    }

    Ok(())
}

fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string();
            CheckResult::ok(name, &format!("found ({})", version))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(_) => CheckResult::error(name, "not found", hint),
    }
}

fn check_env_key(name: &str, hint: &str) -> CheckResult {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => CheckResult::ok(name, "set"),
        _ => CheckResult::error(name, "not set", hint),
    }
}

fn check_tag_snapshot(settings: &Settings) -> CheckResult {
    let path = settings.tags_path();
    match TagCatalog::load(&path) {
        Ok(catalog) => CheckResult::ok(
            "tag snapshot",
            &format!("{} ({} tags)", path.display(), catalog.len()),
        ),
        Err(e) => CheckResult::error(
            "tag snapshot",
            &e.to_string(),
            "Point general.tags_path at a MediaTagCollection snapshot",
        ),
    }
}

fn check_config_file() -> CheckResult {
    let path = Settings::default_config_path();
    if path.exists() {
        CheckResult::ok("config file", &path.display().to_string())
    } else {
        CheckResult::ok(
            "config file",
            &format!("{} (not present, using defaults)", path.display()),
        )
    }
}
