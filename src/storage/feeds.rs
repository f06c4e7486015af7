use tokio::fs;

use super::store::{entry_exists, is_dir, list_names, staging_name, write_new_file, FeedStore};
use super::types::{Feed, FeedMetadata, Listing, StorageError};
use crate::feed::codec;
use crate::util::META_FILE;

impl FeedStore {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// True iff a directory exists for the feed. Invalid names never exist.
    pub async fn feed_exists(&self, name: &str) -> bool {
        match self.feed_dir(name) {
            Ok(dir) => is_dir(&dir).await,
            Err(_) => false,
        }
    }

    /// Create a feed directory holding `metadata` verbatim as `meta.json`.
    ///
    /// The bytes must decode as [`FeedMetadata`]. The directory is assembled
    /// under a hidden staging name and renamed into place, so a failure never
    /// leaves a feed directory without metadata behind.
    ///
    /// # Errors
    ///
    /// - `FeedExists` if anything already exists at the feed's path
    /// - `Parse` if `metadata` is not valid metadata JSON
    /// - `Io` if staging or the final rename fails
    pub async fn create_feed(
        &self,
        name: &str,
        metadata: &[u8],
    ) -> Result<FeedMetadata, StorageError> {
        let dir = self.feed_dir(name)?;
        if entry_exists(&dir).await? {
            return Err(StorageError::FeedExists(name.to_string()));
        }

        let decoded = codec::decode_feed_metadata(metadata)?;

        let staging = self.base.join(staging_name(name));
        fs::create_dir(&staging).await?;

        if let Err(e) = write_new_file(&staging.join(META_FILE), metadata).await {
            let _ = fs::remove_dir_all(&staging).await;
            tracing::error!(feed = %name, error = %e, "Failed to write feed metadata");
            return Err(e);
        }

        // rename(2) silently replaces an empty directory, so re-check right before it.
        if entry_exists(&dir).await? {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(StorageError::FeedExists(name.to_string()));
        }

        if let Err(e) = fs::rename(&staging, &dir).await {
            let _ = fs::remove_dir_all(&staging).await;
            if entry_exists(&dir).await.unwrap_or(false) {
                return Err(StorageError::FeedExists(name.to_string()));
            }
            tracing::error!(feed = %name, error = %e, "Failed to move feed into place");
            return Err(e.into());
        }

        Ok(decoded)
    }

    /// Names of all feed directories, sorted.
    pub async fn list_feed_names(&self) -> Result<Vec<String>, StorageError> {
        list_names(&self.base, true).await.map_err(|e| {
            tracing::error!(path = %self.base.display(), error = %e, "Cannot list feeds");
            e
        })
    }

    /// Read and decode `meta.json` for a feed.
    pub async fn load_feed_metadata(&self, name: &str) -> Result<FeedMetadata, StorageError> {
        let dir = self.feed_dir(name)?;
        if !is_dir(&dir).await {
            return Err(StorageError::FeedNotFound(name.to_string()));
        }

        let bytes = fs::read(dir.join(META_FILE)).await?;
        codec::decode_feed_metadata(&bytes).map_err(|source| StorageError::Corrupt {
            entry: format!("{name}/{META_FILE}"),
            source,
        })
    }

    /// Metadata for every feed whose `meta.json` loads; the rest are skipped.
    pub async fn list_feeds(&self) -> Result<Listing<FeedMetadata>, StorageError> {
        let names = self.list_feed_names().await?;

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let metadata = self.load_feed_metadata(&name).await;
            results.push((name, metadata));
        }

        let listing = Listing::collect_valid(results);
        if listing.skipped > 0 {
            tracing::warn!(skipped = listing.skipped, "Some feeds could not be loaded");
        }
        Ok(listing)
    }

    /// Reconstruct a whole feed: metadata plus every item that decodes.
    pub async fn load_feed(&self, name: &str) -> Result<Feed, StorageError> {
        let metadata = self.load_feed_metadata(name).await?;
        let items = self.load_feed_items(name).await?;

        Ok(Feed {
            metadata,
            items: items.into_values(),
        })
    }
}
