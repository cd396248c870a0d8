use url::Url;

/// Prefixes `https://` when a URL string carries no scheme
pub fn ensure_scheme(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") || raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Resolves a listing link href to an absolute entry URL
///
/// Returns None if the link should be excluded:
/// - empty hrefs and fragment-only anchors
/// - javascript:, mailto:, tel: and data: references
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped, so `post#comments` and
/// `post` name the same entry.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if has_excluded_scheme(href) {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}

/// Resolves an image `src` against the page it appeared on
///
/// Protocol-relative references (`//host/a.jpg`) inherit the scheme of
/// `base_url`; everything else is joined relative to `base_url`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_binder::url::resolve_image_source;
///
/// let base = Url::parse("https://site.example/post").unwrap();
/// let url = resolve_image_source("//img.example.com/a.jpg", &base).unwrap();
/// assert_eq!(url.as_str(), "https://img.example.com/a.jpg");
/// ```
pub fn resolve_image_source(src: &str, base_url: &Url) -> Option<Url> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let absolute_url = if let Some(rest) = src.strip_prefix("//") {
        Url::parse(&format!("{}://{}", base_url.scheme(), rest)).ok()?
    } else {
        base_url.join(src).ok()?
    };

    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}

fn has_excluded_scheme(href: &str) -> bool {
    let lowered = href.to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
}
