//! AniList GraphQL gateway.
//!
//! One stateless call: media id in, normalized [`AnimeDetail`] out. The
//! response shaping degrades missing upstream fields to placeholders rather
//! than erroring; network and non-2xx failures propagate to the caller.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// AniList GraphQL endpoint.
pub const ANILIST_API: &str = "https://graphql.anilist.co";

const DETAIL_QUERY: &str = r#"
query ($id: Int) {
  Media(id: $id, type: ANIME) {
    title { romaji english }
    startDate { day month year }
    countryOfOrigin
    genres
    duration
    episodes
    tags { name }
    description(asHtml: false)
    recommendations(perPage: 10, sort: RATING_DESC) {
      edges {
        node {
          rating
          mediaRecommendation {
            title { english }
            genres
          }
        }
      }
    }
  }
}
"#;

/// Normalized detail record for a single anime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeDetail {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub country_of_origin: String,
    pub duration_minutes: u32,
    pub episodes: u32,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub top_recommendations: Vec<Recommendation>,
}

/// A rated recommendation attached to an anime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub score: i32,
    pub genres: Vec<String>,
}

// Raw response shapes. Everything is optional: AniList omits or nulls
// fields freely, and normalization owns the defaults.

#[derive(Debug, Default, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    data: Option<DetailData>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailData {
    #[serde(rename = "Media", default)]
    media: Option<RawMedia>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMedia {
    #[serde(default)]
    title: Option<RawTitle>,
    #[serde(default)]
    start_date: Option<RawDate>,
    #[serde(default)]
    country_of_origin: Option<String>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    episodes: Option<u32>,
    #[serde(default)]
    tags: Option<Vec<RawTag>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recommendations: Option<RawRecommendations>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTitle {
    #[serde(default)]
    romaji: Option<String>,
    #[serde(default)]
    english: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDate {
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    month: Option<u32>,
    #[serde(default)]
    day: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTag {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawRecommendations {
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEdge {
    #[serde(default)]
    node: Option<RawNode>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNode {
    #[serde(default)]
    rating: Option<i32>,
    #[serde(rename = "mediaRecommendation", default)]
    media_recommendation: Option<RawMediaRecommendation>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMediaRecommendation {
    #[serde(default)]
    title: Option<RawTitle>,
    #[serde(default)]
    genres: Option<Vec<String>>,
}

/// Fetch and normalize the detail record for a media id.
pub async fn fetch_anime_detail(client: &reqwest::Client, id: i64) -> Result<AnimeDetail> {
    let body = serde_json::json!({
        "query": DETAIL_QUERY,
        "variables": { "id": id },
    });

    let response: DetailResponse = client
        .post(ANILIST_API)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let media = response
        .data
        .and_then(|d| d.media)
        .unwrap_or_default();

    Ok(normalize(media))
}

fn normalize(media: RawMedia) -> AnimeDetail {
    let title = media
        .title
        .map(|t| pick_title(t.english, t.romaji))
        .unwrap_or_else(|| "Unknown Title".to_string());

    let description = media
        .description
        .map(|d| first_paragraph(&d))
        .unwrap_or_default();

    let start_date = format_start_date(&media.start_date.unwrap_or_default());

    let tags = media
        .tags
        .unwrap_or_default()
        .into_iter()
        .take(5)
        .map(|t| t.name)
        .collect();

    let top_recommendations = media
        .recommendations
        .unwrap_or_default()
        .edges
        .into_iter()
        .filter_map(|edge| {
            let node = edge.node?;
            let rec = node.media_recommendation?;
            // Entries without an English title are dropped, not substituted.
            let title = rec.title?.english.filter(|t| !t.is_empty())?;
            Some(Recommendation {
                title,
                score: node.rating.unwrap_or(0),
                genres: rec.genres.unwrap_or_default(),
            })
        })
        .collect();

    AnimeDetail {
        title,
        description,
        start_date,
        country_of_origin: media
            .country_of_origin
            .unwrap_or_else(|| "Unknown".to_string()),
        duration_minutes: media.duration.unwrap_or(0),
        episodes: media.episodes.unwrap_or(0),
        genres: media.genres.unwrap_or_default(),
        tags,
        top_recommendations,
    }
}

/// English if present, else romaji, else the literal placeholder.
fn pick_title(english: Option<String>, romaji: Option<String>) -> String {
    english
        .filter(|t| !t.is_empty())
        .or_else(|| romaji.filter(|t| !t.is_empty()))
        .unwrap_or_else(|| "Unknown Title".to_string())
}

/// First paragraph of a description: collapse `<br><br>` to a newline,
/// cut at the first newline, trim.
fn first_paragraph(raw: &str) -> String {
    let collapsed = raw.replace("<br><br>", "\n");
    collapsed
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Render a fuzzy date. Each component stands alone: month and day are
/// zero-padded to width 2, absent components render as "??".
fn format_start_date(date: &RawDate) -> String {
    let year = date
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "??".to_string());
    let month = date
        .month
        .map(|m| format!("{:02}", m))
        .unwrap_or_else(|| "??".to_string());
    let day = date
        .day
        .map(|d| format!("{:02}", d))
        .unwrap_or_else(|| "??".to_string());
    format!("{}-{}-{}", year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media_from(value: serde_json::Value) -> RawMedia {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_title_prefers_english() {
        let detail = normalize(media_from(serde_json::json!({
            "title": { "english": "Cowboy Bebop", "romaji": "Kaubooi Bebappu" }
        })));
        assert_eq!(detail.title, "Cowboy Bebop");
    }

    #[test]
    fn test_title_falls_back_to_romaji() {
        let detail = normalize(media_from(serde_json::json!({
            "title": { "english": null, "romaji": "Kaubooi Bebappu" }
        })));
        assert_eq!(detail.title, "Kaubooi Bebappu");
    }

    #[test]
    fn test_title_placeholder_when_both_missing() {
        let detail = normalize(media_from(serde_json::json!({ "title": {} })));
        assert_eq!(detail.title, "Unknown Title");

        let detail = normalize(RawMedia::default());
        assert_eq!(detail.title, "Unknown Title");
    }

    #[test]
    fn test_description_cut_at_first_break() {
        let detail = normalize(media_from(serde_json::json!({
            "description": "First paragraph.<br><br>Second paragraph."
        })));
        assert_eq!(detail.description, "First paragraph.");
    }

    #[test]
    fn test_description_trims_and_keeps_single_line() {
        let detail = normalize(media_from(serde_json::json!({
            "description": "  Only line, no breaks.  "
        })));
        assert_eq!(detail.description, "Only line, no breaks.");
    }

    #[test]
    fn test_empty_description_is_empty_not_error() {
        let detail = normalize(media_from(serde_json::json!({ "description": "" })));
        assert_eq!(detail.description, "");
    }

    #[test]
    fn test_date_components_are_independent() {
        let render = |value: serde_json::Value| {
            format_start_date(&serde_json::from_value(value).unwrap())
        };
        assert_eq!(render(serde_json::json!({ "year": 2020 })), "2020-??-??");
        assert_eq!(
            render(serde_json::json!({ "year": 1998, "month": 4, "day": 3 })),
            "1998-04-03"
        );
        assert_eq!(render(serde_json::json!({ "month": 12 })), "??-12-??");
        assert_eq!(render(serde_json::json!({})), "??-??-??");
    }

    #[test]
    fn test_tags_capped_at_five() {
        let detail = normalize(media_from(serde_json::json!({
            "tags": [
                { "name": "Space" }, { "name": "Noir" }, { "name": "Bounty Hunters" },
                { "name": "Episodic" }, { "name": "Jazz" }, { "name": "Guns" }
            ]
        })));
        assert_eq!(detail.tags.len(), 5);
        assert_eq!(detail.tags[0], "Space");
        assert!(!detail.tags.contains(&"Guns".to_string()));
    }

    #[test]
    fn test_recommendations_drop_entries_without_english_title() {
        let detail = normalize(media_from(serde_json::json!({
            "recommendations": { "edges": [
                { "node": { "rating": 120, "mediaRecommendation": {
                    "title": { "english": "Samurai Champloo" }, "genres": ["Action"] } } },
                { "node": { "rating": 90, "mediaRecommendation": {
                    "title": { "english": null, "romaji": "Untranslated" }, "genres": [] } } },
                { "node": { "rating": 50, "mediaRecommendation": {
                    "title": { "english": "" }, "genres": [] } } }
            ] }
        })));
        assert_eq!(detail.top_recommendations.len(), 1);
        assert_eq!(detail.top_recommendations[0].title, "Samurai Champloo");
        assert_eq!(detail.top_recommendations[0].score, 120);
    }

    #[test]
    fn test_missing_fields_degrade_to_placeholders() {
        let detail = normalize(RawMedia::default());
        assert_eq!(detail.country_of_origin, "Unknown");
        assert_eq!(detail.duration_minutes, 0);
        assert_eq!(detail.episodes, 0);
        assert!(detail.genres.is_empty());
        assert!(detail.top_recommendations.is_empty());
        assert_eq!(detail.start_date, "??-??-??");
    }
}
