//! One-shot recommendation command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::enrich::{self, TitleDetail};
use crate::error::Result;
use crate::session::ChatSession;
use std::time::Duration;

/// Run one query through a full session cycle and print the result.
pub async fn run_recommend(
    query: &str,
    details: bool,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Recommend) {
        Output::error(&format!("{}", e));
        Output::info("Run 'anirec doctor' for detailed diagnostics.");
        return Err(e);
    }

    if let Some(model) = model {
        settings.agent.model = model;
    }

    let mut session = ChatSession::new(settings)?;

    let spinner = Output::spinner("Looking for recommendations...");
    session.start().await.inspect_err(|_| spinner.finish_and_clear())?;
    let reply = session.get_recommendation(query).await;
    session.stop().await;
    spinner.finish_and_clear();

    let reply = reply?;
    println!("{}", reply);

    if details {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let doc = enrich::enrich(&client, &reply).await?;
        if doc.is_empty() {
            Output::info("No titles to enrich.");
            return Ok(());
        }

        for (title, detail) in &doc {
            Output::header(title);
            match detail {
                TitleDetail::Found {
                    id,
                    image,
                    description,
                } => {
                    Output::kv("AniList id", &id.to_string());
                    Output::kv("Cover", image);
                    Output::kv("About", description);
                }
                TitleDetail::Error { error } => {
                    Output::kv("Lookup failed", error);
                }
            }
        }
    }

    Ok(())
}
