//! Local AniList tag catalog.
//!
//! The catalog is a snapshot of AniList's `MediaTagCollection`, stored as a
//! local JSON file and loaded once at startup. There is no remote fallback:
//! a missing or malformed snapshot fails startup.

use crate::error::{AnirecError, Result};
use serde::Deserialize;
use std::path::Path;

/// Read-only list of permitted tag names.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagSnapshot {
    data: TagData,
}

#[derive(Debug, Deserialize)]
struct TagData {
    #[serde(rename = "MediaTagCollection")]
    media_tag_collection: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(rename = "isAdult", default)]
    is_adult: bool,
}

impl TagCatalog {
    /// Load the catalog from a snapshot file, filtering out adult tags.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnirecError::Tags(format!(
                "failed to read tag snapshot {}: {}",
                path.display(),
                e
            ))
        })?;

        let snapshot: TagSnapshot = serde_json::from_str(&content).map_err(|e| {
            AnirecError::Tags(format!(
                "malformed tag snapshot {}: {}",
                path.display(),
                e
            ))
        })?;

        let names = snapshot
            .data
            .media_tag_collection
            .into_iter()
            .filter(|tag| !tag.is_adult)
            .map(|tag| tag.name)
            .collect();

        Ok(Self { names })
    }

    /// All permitted tag names, in snapshot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_snapshot(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_filters_adult_tags() {
        let file = write_snapshot(
            r#"{"data":{"MediaTagCollection":[{"name":"Gore","isAdult":true},{"name":"Comedy"}]}}"#,
        );
        let catalog = TagCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.names(), ["Comedy".to_string()]);
    }

    #[test]
    fn test_absent_adult_flag_means_not_adult() {
        let file = write_snapshot(
            r#"{"data":{"MediaTagCollection":[{"name":"Space"},{"name":"Josei","isAdult":false}]}}"#,
        );
        let catalog = TagCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_missing_snapshot_fails() {
        let err = TagCatalog::load(Path::new("/nonexistent/tags.json")).unwrap_err();
        assert!(matches!(err, AnirecError::Tags(_)));
    }

    #[test]
    fn test_malformed_snapshot_fails() {
        let file = write_snapshot(r#"{"data":{"MediaTagCollection":"oops"}}"#);
        let err = TagCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, AnirecError::Tags(_)));
    }
}
