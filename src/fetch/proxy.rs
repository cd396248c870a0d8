//! Proxy source lookups
//!
//! A proxy source is an HTTP endpoint that answers each GET with a single
//! proxy address such as `10.0.0.7:8080`. It is queried fresh for every
//! request attempt; there is no pool and no quality tracking.

use crate::fetch::FetchError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ProxySource {
    endpoint: String,
}

impl ProxySource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Asks the source for one proxy and returns it as a proxy URL
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Proxy URL such as `http://10.0.0.7:8080`
    /// * `Err(FetchError::Proxy)` - The source was unreachable or answered garbage
    pub async fn next_proxy(&self, client: &Client, timeout: Duration) -> Result<String, FetchError> {
        let response = client
            .get(&self.endpoint)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::Proxy(format!("{}: {}", self.endpoint, e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Proxy(format!(
                "{} answered HTTP {}",
                self.endpoint,
                response.status().as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Proxy(format!("{}: {}", self.endpoint, e)))?;

        normalize_proxy_address(&body)
    }
}

/// Turns a proxy source answer into a proxy URL
///
/// Bare `host:port` answers get an `http://` scheme; answers that already
/// carry a scheme are kept.
///
/// # Examples
///
/// ```
/// use sumi_binder::fetch::normalize_proxy_address;
///
/// assert_eq!(
///     normalize_proxy_address(" 10.0.0.7:8080\n").unwrap(),
///     "http://10.0.0.7:8080"
/// );
/// ```
pub fn normalize_proxy_address(raw: &str) -> Result<String, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::Proxy("empty proxy address".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| FetchError::Proxy(format!("invalid proxy address '{}': {}", trimmed, e)))?;
    if parsed.host_str().is_none() {
        return Err(FetchError::Proxy(format!(
            "proxy address '{}' has no host",
            trimmed
        )));
    }

    Ok(candidate)
}
