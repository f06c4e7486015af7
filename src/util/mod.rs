//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Item keys**: Unicode-aware title sanitizing used as item file names
//! - **Path segments**: validation of feed names and item keys taken from request paths
//!
//! # Examples
//!
//! ```
//! use feedbox::util::{item_key_for, validate_feed_name};
//!
//! assert_eq!(item_key_for("Hello, World!").unwrap(), "HelloWorld");
//! assert!(validate_feed_name("../etc").is_err());
//! ```

mod names;

pub use names::{
    item_key_for, sanitize_title, validate_feed_name, validate_item_key, NameError, META_FILE,
};
