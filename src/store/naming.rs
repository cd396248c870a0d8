//! Deterministic, hash-based asset naming
//!
//! Every stored file is named after the SHA-256 of the URL it came from, so
//! names never collide across a run and a re-run overwrites instead of
//! duplicating.

use sha2::{Digest, Sha256};
use url::Url;

/// Length of a hex-encoded SHA-256 digest
pub const KEY_LENGTH: usize = 64;

const DEFAULT_IMAGE_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LENGTH: usize = 5;

/// Derives the content key of a URL
///
/// The key is the lowercase hex SHA-256 of the URL string. Identical URLs
/// always produce identical keys.
///
/// # Examples
///
/// ```
/// use sumi_binder::content_key;
///
/// let a = content_key("https://blog.example/post/1");
/// assert_eq!(a, content_key("https://blog.example/post/1"));
/// assert_ne!(a, content_key("https://blog.example/post/2"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// File name for a stored article document
pub fn document_file_name(key: &str) -> String {
    format!("{}.html", key)
}

/// File name for a stored image: `<content key>.<extension>`
pub fn image_file_name(url: &Url) -> String {
    format!("{}.{}", content_key(url.as_str()), image_extension(url))
}

/// Extension of the last path segment, lowercased; `jpg` when absent or odd
pub fn image_extension(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match segment.rsplit_once('.') {
        Some((stem, extension))
            if !stem.is_empty()
                && !extension.is_empty()
                && extension.len() <= MAX_EXTENSION_LENGTH
                && extension.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            extension.to_ascii_lowercase()
        }
        _ => DEFAULT_IMAGE_EXTENSION.to_string(),
    }
}

/// Returns true if `name` has the shape of a content-addressed file name
pub fn is_content_addressed(name: &str) -> bool {
    let Some((stem, extension)) = name.split_once('.') else {
        return false;
    };

    stem.len() == KEY_LENGTH
        && stem.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        && !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LENGTH
        && extension.chars().all(|c| c.is_ascii_alphanumeric())
}
