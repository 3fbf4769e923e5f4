//! Web search gateway.
//!
//! Wraps the Linkup search API in a single call that returns a short,
//! prompt-ready digest of the top results. No retries; failures propagate.

use crate::config::SearchSettings;
use crate::error::{AnirecError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Client for the web search provider.
pub struct SearchClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    depth: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchClient {
    /// Build a client from settings, reading the API key from the
    /// `LINKUP_API_KEY` environment variable.
    pub fn from_env(settings: &SearchSettings) -> Result<Self> {
        let api_key = std::env::var("LINKUP_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AnirecError::Config(
                    "LINKUP_API_KEY not set. Set it with: export LINKUP_API_KEY='...'".to_string(),
                )
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            endpoint: settings.endpoint.clone(),
            depth: settings.depth.clone(),
            max_results: settings.max_results,
        })
    }

    /// Run one search and format the top results as a digest.
    pub async fn search(&self, query: &str) -> Result<String> {
        let body = serde_json::json!({
            "q": query,
            "depth": self.depth,
            "outputType": "searchResults",
        });

        let response: SearchResponse = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AnirecError::Search(e.to_string()))?
            .json()
            .await?;

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        Ok(format_digest(query, &today, &response.results, self.max_results))
    }
}

/// Header line with the query and date, then name/url/content per result.
fn format_digest(query: &str, date: &str, results: &[SearchResult], max: usize) -> String {
    let mut digest = format!("Search results for '{}' on {}\n\n", query, date);
    for result in results.iter().take(max) {
        digest.push_str(&format!(
            "{}\n{}\n{}\n\n",
            result.name, result.url, result.content
        ));
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, url: &str, content: &str) -> SearchResult {
        SearchResult {
            name: name.to_string(),
            url: url.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_digest_header_and_entries() {
        let results = vec![
            result("Top 10 space westerns", "https://example.com/a", "Bebop leads the pack."),
            result("Anime noir list", "https://example.com/b", "Jazz and bounty hunters."),
        ];
        let digest = format_digest("space western anime", "2025-06-01", &results, 3);

        assert!(digest.starts_with("Search results for 'space western anime' on 2025-06-01\n\n"));
        assert!(digest.contains("Top 10 space westerns\nhttps://example.com/a\nBebop leads the pack.\n\n"));
        assert!(digest.contains("Anime noir list\n"));
    }

    #[test]
    fn test_digest_caps_results() {
        let results: Vec<SearchResult> = (0..6)
            .map(|i| result(&format!("r{}", i), "u", "c"))
            .collect();
        let digest = format_digest("q", "2025-06-01", &results, 3);

        assert!(digest.contains("r2\n"));
        assert!(!digest.contains("r3\n"));
    }

    #[test]
    fn test_digest_with_no_results_is_just_header() {
        let digest = format_digest("q", "2025-06-01", &[], 3);
        assert_eq!(digest, "Search results for 'q' on 2025-06-01\n\n");
    }
}
