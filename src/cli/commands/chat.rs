//! Interactive recommendation chat.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::session::ChatSession;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Recommend) {
        Output::error(&format!("{}", e));
        Output::info("Run 'anirec doctor' for detailed diagnostics.");
        return Err(e);
    }

    if let Some(model) = model {
        settings.agent.model = model;
    }

    let mut session = ChatSession::new(settings)?;

    println!("\n{}", style("Anirec Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type what you're in the mood for, or 'exit' to quit. Use 'clear' to reset context, 'prefs' to see learned preferences.").dim()
    );

    let spinner = Output::spinner("Starting the bot...");
    match session.start().await {
        Ok(()) => spinner.finish_and_clear(),
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to start: {}", e));
            return Err(e);
        }
    }
    Output::success("Bot is ready. Ask away.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.reset();
            Output::info("Conversation context cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("prefs") {
            show_preferences(&session);
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let reply = session.get_recommendation(input).await;
        spinner.finish_and_clear();

        match reply {
            Ok(reply) => {
                println!("\n{} {}\n", style("Anirec:").cyan().bold(), reply);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    session.stop().await;

    Ok(())
}

fn show_preferences(session: &ChatSession) {
    if session.preferences().is_empty() {
        Output::info("No preferences learned yet.");
        return;
    }

    Output::header("Learned preferences");
    for (key, value) in session.preferences() {
        Output::kv(&key.replace('_', " "), &value.to_string());
    }
    println!();
}
