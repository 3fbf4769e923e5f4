//! HTTP API server command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    mut settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        Output::info("Run 'anirec doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(host) = host {
        settings.http.host = host;
    }
    if let Some(port) = port {
        settings.http.port = port;
    }

    server::run_server(settings).await
}
