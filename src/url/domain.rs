use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_binder::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the second-level label of a URL's host
///
/// Used as a human-readable name for a harvest: `https://www.ruanyifeng.com/blog`
/// becomes `ruanyifeng`. Hosts with a single label (e.g. `localhost`) are
/// returned whole.
pub fn site_name(url: &Url) -> String {
    let Some(domain) = extract_domain(url) else {
        return String::from("site");
    };

    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => String::from("site"),
        1 => labels[0].to_string(),
        n => labels[n - 2].to_string(),
    }
}
