//! URL handling module for Sumi-Binder
//!
//! This module turns user-supplied targets and in-page references into
//! absolute URLs: scheme defaulting for the configured target, link
//! resolution for listing pages, and protocol-relative handling for images.

mod domain;
mod resolve;

pub use domain::{extract_domain, site_name};
pub use resolve::{ensure_scheme, resolve_image_source, resolve_link};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a configured target URL
///
/// A bare host such as `blog.example/archive` is treated as
/// `https://blog.example/archive`. Only http(s) URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use sumi_binder::url::parse_target_url;
///
/// let url = parse_target_url("blog.example").unwrap();
/// assert_eq!(url.as_str(), "https://blog.example/");
/// ```
pub fn parse_target_url(raw: &str) -> UrlResult<Url> {
    let candidate = ensure_scheme(raw.trim());
    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
