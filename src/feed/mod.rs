//! Feed encoding and rendering.
//!
//! - [`codec`] - JSON encode/decode of feed metadata and items, base64 descriptions
//! - [`render`] - RSS 2.0 rendering of a stored feed
//!
//! # Example
//!
//! ```ignore
//! use crate::feed::{codec, render_rss};
//!
//! let feed = store.load_feed("news").await?;
//! let xml = render_rss(&feed)?;
//! let json = codec::encode_json(&codec::decode_descriptions(feed))?;
//! ```

pub mod codec;
mod render;

pub use render::render_rss;
