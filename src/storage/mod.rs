//! Directory-tree storage for feeds and their items.
//!
//! Each feed is a directory under the base path holding `meta.json` plus one
//! JSON file per item, named by the item's sanitized title. Nothing is cached;
//! every read rescans the filesystem.

mod feeds;
mod items;
mod store;
mod types;

pub use store::FeedStore;
pub use types::{Feed, FeedMetadata, Item, Listing, StorageError};
