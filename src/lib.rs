//! feedbox: RSS feeds stored as plain files, served over HTTP.
//!
//! Feeds live as directories under a base path; items are JSON files named by
//! their sanitized titles. The [`server`] module exposes them as JSON and
//! renders RSS 2.0 on demand.

pub mod config;
pub mod feed;
pub mod server;
pub mod storage;
pub mod util;
