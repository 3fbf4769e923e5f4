//! HTTP front door.
//!
//! One process-wide session serves all requests. Because `start`/`stop`
//! mutate the shared subprocess and agent handles, every request takes the
//! session mutex for the whole start..stop bracket; concurrent requests
//! are serialized rather than allowed to corrupt each other's state.

use crate::cli::Output;
use crate::config::Settings;
use crate::enrich::{self, AnimeDoc};
use crate::error::Result;
use crate::session::ChatSession;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    session: Mutex<ChatSession>,
    http: reqwest::Client,
}

/// Run the HTTP API server.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let session = ChatSession::new(settings.clone())?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let state = Arc::new(AppState {
        session: Mutex::new(session),
        http,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/recommend", post(recommend))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", settings.http.host, settings.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Anirec API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Recommend", "POST /recommend");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct RecommendResponse {
    recommendation: AnimeDoc,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> impl IntoResponse {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No query provided".to_string(),
            }),
        )
            .into_response();
    }

    // The lock spans the whole start..stop bracket.
    let reply = {
        let mut session = state.session.lock().await;
        run_turn(&mut session, &req.query).await
    };

    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    match enrich::enrich(&state.http, &reply).await {
        Ok(doc) => Json(RecommendResponse {
            recommendation: doc,
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// One full session cycle with `stop` guaranteed on every exit path.
async fn run_turn(session: &mut ChatSession, query: &str) -> Result<String> {
    if let Err(e) = session.start().await {
        session.stop().await;
        return Err(e);
    }

    let result = session.get_recommendation(query).await;
    session.stop().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_query_field_deserializes_empty() {
        let req: RecommendRequest = serde_json::from_str("{}").unwrap();
        assert!(req.query.is_empty());
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse {
            error: "No query provided".to_string(),
        })
        .unwrap();
        assert_eq!(body["error"], "No query provided");
    }
}
