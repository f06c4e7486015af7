use tokio::fs;

use super::store::{entry_exists, is_dir, list_names, staging_name, write_new_file, FeedStore};
use super::types::{Item, Listing, StorageError};
use crate::feed::codec;
use crate::util::validate_item_key;

impl FeedStore {
    // ========================================================================
    // Item Operations
    // ========================================================================

    /// True iff a file exists for `key` in `feed`. Invalid names never exist.
    pub async fn item_exists(&self, feed: &str, key: &str) -> bool {
        match self.item_path(feed, key) {
            Ok(path) => entry_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Store `item` verbatim as the item file `key` in `feed`.
    ///
    /// The bytes must decode as an [`Item`] whose description is valid base64;
    /// the undecoded bytes are what gets persisted. The file is written under a
    /// hidden staging name and hard-linked into place, so a concurrent create
    /// of the same key fails with `ItemExists` and readers never see a partial
    /// file.
    pub async fn create_item(&self, feed: &str, key: &str, item: &[u8]) -> Result<(), StorageError> {
        let dir = self.feed_dir(feed)?;
        if !is_dir(&dir).await {
            return Err(StorageError::FeedNotFound(feed.to_string()));
        }

        let path = self.item_path(feed, key)?;
        let exists = || StorageError::ItemExists {
            feed: feed.to_string(),
            item: key.to_string(),
        };
        if entry_exists(&path).await? {
            return Err(exists());
        }

        let decoded = codec::decode_item(item)?;
        codec::decode_base64(&decoded.description)?;

        let staging = dir.join(staging_name(key));
        write_new_file(&staging, item).await.map_err(|e| {
            tracing::error!(feed = %feed, item = %key, error = %e, "Cannot create item file");
            e
        })?;

        let linked = fs::hard_link(&staging, &path).await;
        let _ = fs::remove_file(&staging).await;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(exists()),
            Err(e) => {
                tracing::error!(feed = %feed, item = %key, error = %e, "Cannot link item file");
                Err(e.into())
            }
        }
    }

    /// Read and decode a single item.
    pub async fn load_item(&self, feed: &str, key: &str) -> Result<Item, StorageError> {
        let dir = self.feed_dir(feed)?;
        if !is_dir(&dir).await {
            return Err(StorageError::FeedNotFound(feed.to_string()));
        }

        let path = self.item_path(feed, key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ItemNotFound {
                    feed: feed.to_string(),
                    item: key.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        codec::decode_item(&bytes).map_err(|source| StorageError::Corrupt {
            entry: format!("{feed}/{key}"),
            source,
        })
    }

    /// Every item in `feed` keyed by file name, skipping entries that fail to load.
    ///
    /// Only file names usable as item keys are considered, so `meta.json`,
    /// staging entries and files dropped in by hand (`notes.txt`) never show
    /// up in a listing that `load_item` could not serve.
    pub async fn load_feed_items(&self, feed: &str) -> Result<Listing<Item>, StorageError> {
        let dir = self.feed_dir(feed)?;
        if !is_dir(&dir).await {
            return Err(StorageError::FeedNotFound(feed.to_string()));
        }

        let names = list_names(&dir, false).await.map_err(|e| {
            tracing::error!(feed = %feed, error = %e, "Cannot list items");
            e
        })?;

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            if validate_item_key(&name).is_err() {
                tracing::debug!(feed = %feed, entry = %name, "Ignoring non-item entry");
                continue;
            }
            let item = match fs::read(dir.join(&name)).await {
                Ok(bytes) => codec::decode_item(&bytes).map_err(StorageError::from),
                Err(e) => Err(StorageError::from(e)),
            };
            results.push((name, item));
        }

        let listing = Listing::collect_valid(results);
        if listing.skipped > 0 {
            tracing::warn!(feed = %feed, skipped = listing.skipped, "Some items could not be loaded");
        }
        Ok(listing)
    }
}
