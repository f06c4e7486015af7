use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::types::StorageError;
use crate::util::{validate_feed_name, validate_item_key};

/// Prefix for in-progress entries. Names starting with a dot are never valid
/// feed names or item keys, so staging entries are invisible to listings.
const STAGING_PREFIX: &str = ".staging-";

/// Staging entries at least this old are leftovers of an interrupted create.
const STALE_STAGING_AGE: Duration = Duration::from_secs(10 * 60);

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// FeedStore
// ============================================================================

/// Directory-tree feed storage rooted at a base path.
///
/// Layout: `<base>/<feed>/meta.json` holds the feed metadata and
/// `<base>/<feed>/<item key>` holds one item each. The store keeps no
/// in-memory state beyond the base path; every read rescans the directory.
#[derive(Debug, Clone)]
pub struct FeedStore {
    pub(crate) base: PathBuf,
}

impl FeedStore {
    /// Create a store rooted at `base`. The directory is not touched.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Create a store, make sure the base directory exists and clear out
    /// staging entries left behind by a crash.
    pub async fn open(base: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(base);
        fs::create_dir_all(&store.base).await?;

        let removed = store.sweep_staging(STALE_STAGING_AGE).await?;
        if removed > 0 {
            tracing::warn!(removed, "Removed stale staging entries");
        }
        tracing::debug!(path = %store.base.display(), "Opened feed store");
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// Remove staging entries at least `min_age` old from the base directory
    /// and from every feed directory. Returns how many were removed.
    pub(crate) async fn sweep_staging(&self, min_age: Duration) -> Result<usize, StorageError> {
        let mut removed = remove_stale_staging(&self.base, min_age).await?;

        for feed in list_names(&self.base, true).await? {
            match remove_stale_staging(&self.base.join(&feed), min_age).await {
                Ok(count) => removed += count,
                Err(e) => tracing::warn!(feed = %feed, error = %e, "Cannot sweep feed directory"),
            }
        }
        Ok(removed)
    }

    pub(crate) fn feed_dir(&self, feed: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base.join(validate_feed_name(feed)?))
    }

    pub(crate) fn item_path(&self, feed: &str, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.feed_dir(feed)?.join(validate_item_key(key)?))
    }
}

// ============================================================================
// Filesystem Helpers
// ============================================================================

/// True if anything (file, directory, dangling symlink) exists at `path`.
pub(crate) async fn entry_exists(path: &Path) -> Result<bool, StorageError> {
    match fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Entry names in `dir`, sorted, with staging entries and non-UTF-8 names left out.
///
/// When `dirs_only` is set, entries that are not directories are dropped too.
pub(crate) async fn list_names(dir: &Path, dirs_only: bool) -> Result<Vec<String>, StorageError> {
    let mut reader = fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!(dir = %dir.display(), "Ignoring entry with non-UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if dirs_only && !entry.file_type().await?.is_dir() {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Unique hidden name for staging `target` next to its final location.
pub(crate) fn staging_name(target: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{STAGING_PREFIX}{target}-{:x}-{nanos:016x}-{seq}",
        std::process::id()
    )
}

async fn remove_stale_staging(dir: &Path, min_age: Duration) -> Result<usize, StorageError> {
    let mut reader = fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = reader.next_entry().await? {
        let is_staging = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(STAGING_PREFIX));
        if !is_staging {
            continue;
        }

        let meta = entry.metadata().await?;
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or_default();
        if age < min_age {
            continue;
        }

        let path = entry.path();
        let result = if meta.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot remove staging entry"),
        }
    }
    Ok(removed)
}

/// Write `bytes` to a new file at `path` and sync it to disk.
///
/// Fails if `path` already exists. On failure the partial file is removed.
pub(crate) async fn write_new_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    let written = async {
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path).await;
        return Err(e.into());
    }
    Ok(())
}
