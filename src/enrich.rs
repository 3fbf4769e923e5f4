//! Title-detail enrichment.
//!
//! Post-processes the orchestrator's free text: every `**Title**` span is
//! looked up by name against AniList and mapped to an id, cover image, and
//! description. The extraction is a narrow pattern match and deliberately
//! fragile to prompt-format drift; the prompts ask for exactly this format.

use crate::anilist::ANILIST_API;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const SEARCH_QUERY: &str = r#"
query ($search: String) {
  Media(search: $search, type: ANIME) {
    id
    coverImage { large }
    description(asHtml: false)
  }
}
"#;

/// Per-title lookup results, keyed by extracted title. Duplicate
/// extractions collapse to one key; the last lookup wins.
pub type AnimeDoc = BTreeMap<String, TitleDetail>;

/// Outcome of one by-name lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitleDetail {
    Found {
        id: i64,
        image: String,
        description: String,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    data: Option<LookupData>,
}

#[derive(Debug, Deserialize)]
struct LookupData {
    #[serde(rename = "Media", default)]
    media: Option<LookupMedia>,
}

#[derive(Debug, Deserialize)]
struct LookupMedia {
    id: i64,
    #[serde(rename = "coverImage", default)]
    cover_image: Option<CoverImage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CoverImage {
    #[serde(default)]
    large: Option<String>,
}

/// Look up every bolded title in the text and map it to its details.
///
/// A non-success lookup is recorded per title instead of failing the
/// batch; a successful lookup with no matching media yields no entry.
pub async fn enrich(client: &reqwest::Client, text: &str) -> Result<AnimeDoc> {
    let mut doc = AnimeDoc::new();

    for title in extract_titles(text) {
        let body = serde_json::json!({
            "query": SEARCH_QUERY,
            "variables": { "search": title },
        });

        let response = client.post(ANILIST_API).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            let parsed: LookupResponse = response.json().await?;
            match parsed.data.and_then(|d| d.media) {
                Some(media) => {
                    doc.insert(title, detail_from_media(media));
                }
                None => debug!("No AniList match for '{}'", title),
            }
        } else {
            doc.insert(title, error_detail(status.as_u16()));
        }
    }

    Ok(doc)
}

/// Extract candidate titles: every span between double-asterisk markers.
pub fn extract_titles(text: &str) -> Vec<String> {
    let pattern = Regex::new(r"\*\*(.*?)\*\*").expect("valid title pattern");
    pattern
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn detail_from_media(media: LookupMedia) -> TitleDetail {
    TitleDetail::Found {
        id: media.id,
        image: media
            .cover_image
            .and_then(|c| c.large)
            .unwrap_or_else(|| "No image available".to_string()),
        description: media
            .description
            .unwrap_or_else(|| "No description available".to_string()),
    }
}

fn error_detail(status: u16) -> TitleDetail {
    TitleDetail::Error {
        error: format!("Error fetching data: {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_titles_from_recommendation_lines() {
        let text = "1. **Cowboy Bebop** - 9/10\n2. **Erased** - 8/10\n";
        assert_eq!(extract_titles(text), ["Cowboy Bebop", "Erased"]);
    }

    #[test]
    fn test_extract_titles_ignores_unbolded_text() {
        assert!(extract_titles("no recommendations today").is_empty());
        assert!(extract_titles("half **open marker").is_empty());
    }

    #[test]
    fn test_duplicate_titles_collapse_in_doc() {
        let text = "**Erased** and again **Erased**";
        let titles = extract_titles(text);
        assert_eq!(titles.len(), 2);

        let mut doc = AnimeDoc::new();
        for (i, title) in titles.into_iter().enumerate() {
            doc.insert(
                title,
                TitleDetail::Found {
                    id: i as i64,
                    image: "img".to_string(),
                    description: "desc".to_string(),
                },
            );
        }
        assert_eq!(doc.len(), 1);
        assert_eq!(
            doc.get("Erased"),
            Some(&TitleDetail::Found {
                id: 1,
                image: "img".to_string(),
                description: "desc".to_string(),
            })
        );
    }

    #[test]
    fn test_detail_placeholders_for_missing_fields() {
        let media: LookupMedia = serde_json::from_str(r#"{"id": 5114}"#).unwrap();
        assert_eq!(
            detail_from_media(media),
            TitleDetail::Found {
                id: 5114,
                image: "No image available".to_string(),
                description: "No description available".to_string(),
            }
        );
    }

    #[test]
    fn test_detail_uses_real_fields_when_present() {
        let media: LookupMedia = serde_json::from_str(
            r#"{"id": 1, "coverImage": {"large": "https://img.anili.st/1.png"}, "description": "Space bounty hunters."}"#,
        )
        .unwrap();
        assert_eq!(
            detail_from_media(media),
            TitleDetail::Found {
                id: 1,
                image: "https://img.anili.st/1.png".to_string(),
                description: "Space bounty hunters.".to_string(),
            }
        );
    }

    #[test]
    fn test_error_record_carries_status() {
        assert_eq!(
            error_detail(404),
            TitleDetail::Error {
                error: "Error fetching data: 404".to_string(),
            }
        );
    }

    #[test]
    fn test_doc_serialization_shape() {
        let mut doc = AnimeDoc::new();
        doc.insert(
            "Cowboy Bebop".to_string(),
            TitleDetail::Found {
                id: 1,
                image: "url".to_string(),
                description: "desc".to_string(),
            },
        );
        doc.insert("Lost Title".to_string(), error_detail(500));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["Cowboy Bebop"]["id"], 1);
        assert_eq!(json["Lost Title"]["error"], "Error fetching data: 500");
    }
}
