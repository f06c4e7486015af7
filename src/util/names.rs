use thiserror::Error;
use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

/// File name reserved for feed metadata inside every feed directory.
pub const META_FILE: &str = "meta.json";

/// Errors produced when a feed name or item key cannot be used as a path segment.
///
/// Names arrive percent-decoded from the request path, so anything that could
/// escape the base directory or collide with staging entries is rejected here,
/// before the filesystem is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty.
    #[error("Name must not be empty")]
    Empty,
    /// The name is `.` or `..`.
    #[error("Name '{0}' is reserved")]
    Reserved(String),
    /// The name contains a path separator or NUL byte.
    #[error("Name '{0}' contains a path separator")]
    Separator(String),
    /// The name starts with a dot (used for in-progress staging entries).
    #[error("Name '{0}' must not start with a dot")]
    Hidden(String),
    /// The item key contains something other than letters and digits.
    #[error("Item key '{0}' may only contain letters and digits")]
    NotAnItemKey(String),
    /// The item title sanitizes to an empty key.
    #[error("Item title '{0}' contains no letters or digits")]
    NoAlphanumeric(String),
}

/// Letters are any `L*` category; digits are decimal digits (`Nd`) only, so
/// superscripts, Roman numerals and combining marks are not key characters.
fn is_key_char(c: char) -> bool {
    c.general_category_group() == GeneralCategoryGroup::Letter
        || c.general_category() == GeneralCategory::DecimalNumber
}

/// Strips every character that is not a Unicode letter or decimal digit.
///
/// The result is the item's storage key. The mapping is lossy: `"Hello!"`
/// and `"He-llo"` both produce `"Hello"`.
///
/// # Examples
///
/// ```
/// use feedbox::util::sanitize_title;
///
/// assert_eq!(sanitize_title("Hello, World! #42"), "HelloWorld42");
/// assert_eq!(sanitize_title("Café 2024"), "Café2024");
/// ```
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|&c| is_key_char(c)).collect()
}

/// Derives the item key for a title, rejecting titles with nothing left after sanitizing.
pub fn item_key_for(title: &str) -> Result<String, NameError> {
    let key = sanitize_title(title);
    if key.is_empty() {
        return Err(NameError::NoAlphanumeric(title.to_string()));
    }
    Ok(key)
}

/// Validates a feed name for use as a directory under the base path.
pub fn validate_feed_name(name: &str) -> Result<&str, NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(NameError::Reserved(name.to_string()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(NameError::Separator(name.to_string()));
    }
    if name.starts_with('.') {
        return Err(NameError::Hidden(name.to_string()));
    }
    Ok(name)
}

/// Validates an item key taken from a request path.
///
/// Only keys that [`sanitize_title`] could have produced are accepted, which
/// also keeps `meta.json` out of reach of the item endpoints.
pub fn validate_item_key(key: &str) -> Result<&str, NameError> {
    if key.is_empty() {
        return Err(NameError::Empty);
    }
    if !key.chars().all(is_key_char) {
        return Err(NameError::NotAnItemKey(key.to_string()));
    }
    Ok(key)
}
