use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Serialize;

use crate::storage::{Feed, FeedMetadata, Item};

pub fn decode_feed_metadata(bytes: &[u8]) -> Result<FeedMetadata, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn decode_item(bytes: &[u8]) -> Result<Item, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Encode any model value as compact JSON, field names as declared on the type.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Standard alphabet with canonical padding, tolerating non-zero trailing bits
/// in the last symbol (`"aGl="` decodes to `"hi"`).
const DESCRIPTION_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode standard, padded base64. Line breaks are ignored, as in MIME-wrapped input.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let text = if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], ""))
    } else {
        Cow::Borrowed(text)
    };
    DESCRIPTION_ENGINE.decode(text.as_bytes())
}

/// The item's description as text. Invalid UTF-8 is replaced, not rejected.
pub fn decode_description(item: &Item) -> Result<String, base64::DecodeError> {
    let bytes = decode_base64(&item.description)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Copy of `feed` with every description decoded to plain text.
///
/// Items whose description does not decode are dropped, matching what the
/// RSS rendering does with them.
pub fn decode_descriptions(feed: Feed) -> Feed {
    let items = feed
        .items
        .into_iter()
        .filter_map(|item| match decode_description(&item) {
            Ok(description) => Some(Item {
                description,
                ..item
            }),
            Err(e) => {
                tracing::warn!(item = %item.title, error = %e, "Dropping item with undecodable description");
                None
            }
        })
        .collect();

    Feed {
        metadata: feed.metadata,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metadata_round_trip_is_lossless() {
        let raw = br#"{"Title":"T","Description":"D","Link":"L"}"#;
        let meta = decode_feed_metadata(raw).unwrap();
        assert_eq!(encode_json(&meta).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_item_round_trip_keeps_date() {
        let raw = br#"{"Title":"A","Link":"L","Description":"aGk=","Date":"2024-05-01"}"#;
        let item = decode_item(raw).unwrap();
        assert_eq!(item.date.as_deref(), Some("2024-05-01"));
        assert_eq!(encode_json(&item).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(decode_item(b"{\"Title\": ").is_err());
        assert!(decode_feed_metadata(b"42").is_err());
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("PGI+aGk8L2I+").unwrap(), b"<b>hi</b>");
        assert_eq!(decode_base64("PGI+\r\naGk8L2I+").unwrap(), b"<b>hi</b>");
        assert_eq!(decode_base64("").unwrap(), b"");
        assert!(decode_base64("not base64!!").is_err());
        assert!(decode_base64("aGk").is_err());
    }

    #[test]
    fn test_decode_base64_allows_trailing_bits() {
        assert_eq!(decode_base64("aGl=").unwrap(), b"hi");
        assert_eq!(decode_base64("YR==").unwrap(), b"a");
        assert!(decode_base64("aGl").is_err());
    }

    #[test]
    fn test_decode_descriptions_drops_bad_items() {
        let feed = Feed {
            metadata: FeedMetadata::default(),
            items: vec![
                Item {
                    title: "good".to_string(),
                    description: "aGVsbG8=".to_string(),
                    ..Item::default()
                },
                Item {
                    title: "bad".to_string(),
                    description: "%%%".to_string(),
                    ..Item::default()
                },
            ],
        };

        let decoded = decode_descriptions(feed);
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].title, "good");
        assert_eq!(decoded.items[0].description, "hello");
    }
}
