use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

use crate::util::NameError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the on-disk feed store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No directory exists for the feed
    #[error("The feed {0} does not exist")]
    FeedNotFound(String),

    /// A directory already exists for the feed
    #[error("Feed {0} already exists")]
    FeedExists(String),

    /// No file exists for the item key in the feed
    #[error("The item {item} does not exist in feed {feed}")]
    ItemNotFound { feed: String, item: String },

    /// A file already exists for the item key in the feed
    #[error("Item {item} already exists in feed {feed}")]
    ItemExists { feed: String, item: String },

    /// Malformed JSON, either in a request body or on disk
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A stored file exists but does not decode
    #[error("Stored entry {entry} is corrupt: {source}")]
    Corrupt {
        entry: String,
        source: serde_json::Error,
    },

    /// Item description is not valid base64
    #[error("Item description invalid: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Feed name or item key cannot be used as a path segment
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// Filesystem failure not attributable to the request
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True when the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Io(_) | StorageError::Corrupt { .. })
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Feed-level metadata, stored as `meta.json` in the feed directory.
///
/// Field names are PascalCase on the wire. Lowercase names are accepted when
/// decoding and missing fields default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedMetadata {
    #[serde(default, alias = "title")]
    pub title: String,
    #[serde(default, alias = "description")]
    pub description: String,
    #[serde(default, alias = "link")]
    pub link: String,
}

/// A single feed entry. `description` holds base64 text except in decoded views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(default, alias = "title")]
    pub title: String,
    #[serde(default, alias = "link")]
    pub link: String,
    #[serde(default, alias = "description")]
    pub description: String,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A feed reconstructed from its directory: metadata plus items in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(rename = "MetaData")]
    pub metadata: FeedMetadata,
    #[serde(rename = "Items", default)]
    pub items: Vec<Item>,
}

/// Result of a best-effort directory scan.
///
/// Entries that fail to load are dropped and counted instead of failing the
/// whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    /// Successfully loaded entries as `(name, value)`, in directory order
    pub entries: Vec<(String, T)>,
    /// Number of entries dropped because they could not be read or decoded
    pub skipped: usize,
}

impl<T> Listing<T> {
    /// Collect-valid, skip-invalid: keeps every `Ok`, logs and counts every `Err`.
    pub fn collect_valid<E, I>(results: I) -> Self
    where
        E: Display,
        I: IntoIterator<Item = (String, Result<T, E>)>,
    {
        let mut entries = Vec::new();
        let mut skipped = 0;
        for (name, result) in results {
            match result {
                Ok(value) => entries.push((name, value)),
                Err(e) => {
                    tracing::warn!(entry = %name, error = %e, "Skipping unreadable entry");
                    skipped += 1;
                }
            }
        }
        Self { entries, skipped }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keyed view used by the JSON listing endpoints (sorted by name).
    pub fn into_map(self) -> BTreeMap<String, T> {
        self.entries.into_iter().collect()
    }

    pub fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metadata_uses_pascal_case_fields() {
        let meta = FeedMetadata {
            title: "T".to_string(),
            description: "D".to_string(),
            link: "L".to_string(),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"Title":"T","Description":"D","Link":"L"}"#);
    }

    #[test]
    fn test_metadata_accepts_lowercase_and_missing_fields() {
        let meta: FeedMetadata = serde_json::from_str(r#"{"title":"T"}"#).unwrap();
        assert_eq!(meta.title, "T");
        assert_eq!(meta.description, "");
        assert_eq!(meta.link, "");
    }

    #[test]
    fn test_item_date_omitted_when_absent() {
        let item = Item {
            title: "A".to_string(),
            link: "https://example.com/a".to_string(),
            description: "aGk=".to_string(),
            date: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("Date"));

        let dated = Item {
            date: Some("2024-01-01T00:00:00Z".to_string()),
            ..item
        };
        let json = serde_json::to_string(&dated).unwrap();
        assert!(json.contains(r#""Date":"2024-01-01T00:00:00Z""#));
    }

    #[test]
    fn test_feed_serializes_empty_items_as_list() {
        let feed = Feed::default();
        let json = serde_json::to_value(&feed).unwrap();
        assert_eq!(json["Items"], serde_json::json!([]));
        assert!(json["MetaData"].is_object());
    }

    #[test]
    fn test_collect_valid_counts_skipped() {
        let results: Vec<(String, Result<u32, String>)> = vec![
            ("b".to_string(), Ok(2)),
            ("bad".to_string(), Err("boom".to_string())),
            ("a".to_string(), Ok(1)),
        ];
        let listing = Listing::collect_valid(results);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.skipped, 1);

        let map = listing.into_map();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(StorageError::FeedNotFound("x".to_string()).is_client_error());
        assert!(StorageError::Parse(serde_json::from_str::<Item>("{").unwrap_err()).is_client_error());
        assert!(!StorageError::Io(std::io::Error::other("disk")).is_client_error());
        assert!(!StorageError::Corrupt {
            entry: "news/meta.json".to_string(),
            source: serde_json::from_str::<Item>("{").unwrap_err(),
        }
        .is_client_error());
    }
}
