//! HTTP fetch client implementation
//!
//! This module handles all HTTP requests for the harvest, including:
//! - Building HTTP clients with or without an outbound proxy
//! - Rotating user agents across requests
//! - GET requests for text documents, decoded with their resolved encoding
//! - Streaming binary downloads to disk
//! - Retry, backoff, timeout escalation, and cancellation

use crate::config::FetchConfig;
use crate::fetch::encoding::{decode_body, detect_encoding};
use crate::fetch::{Document, FailureLedger, FetchError, ProxySource, RetryPolicy, RetryState};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Proxy, Response};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// User agents rotated when the configuration does not name any
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Resolved fetch client settings
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub proxy_source: Option<String>,
    pub user_agents: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            proxy_source: None,
            user_agents: Vec::new(),
        }
    }
}

impl FetchSettings {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_unit: Duration::from_millis(config.backoff_unit_ms),
                escalate_read_timeout: config.escalate_read_timeout,
            },
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            proxy_source: config.proxy_source.clone(),
            user_agents: config.user_agents.clone(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `connect_timeout` - Timeout for establishing connections
/// * `proxy` - Proxy URL to route every request through, or `None` for direct
///   connections (environment proxy variables are ignored)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client or parse the proxy URL
pub fn build_http_client(
    connect_timeout: Duration,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true);

    let builder = match proxy {
        Some(proxy_url) => builder.proxy(Proxy::all(proxy_url)?),
        None => builder.no_proxy(),
    };

    builder.build()
}

/// Resilient fetch client shared by every worker of a run
///
/// Failures that survive all retries are written to the run's
/// [`FailureLedger`] and returned as [`FetchError::Exhausted`]; nothing here
/// panics or aborts the run. Cancelling the token stops backoff sleeps and
/// in-flight requests with [`FetchError::Cancelled`].
#[derive(Debug)]
pub struct FetchClient {
    direct: Client,
    settings: FetchSettings,
    proxy_source: Option<ProxySource>,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    ledger: FailureLedger,
    cancel: CancellationToken,
}

impl FetchClient {
    /// Creates a new fetch client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sumi_binder::fetch::{FailureLedger, FetchClient, FetchSettings};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = FetchClient::new(
    ///     FetchSettings::default(),
    ///     FailureLedger::new(),
    ///     CancellationToken::new(),
    /// )?;
    /// let document = client.fetch("https://blog.example/").await?;
    /// println!("{} bytes of {}", document.body.len(), document.encoding_name());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        settings: FetchSettings,
        ledger: FailureLedger,
        cancel: CancellationToken,
    ) -> Result<Self, reqwest::Error> {
        let direct = build_http_client(settings.connect_timeout, None)?;
        let proxy_source = settings.proxy_source.as_deref().map(ProxySource::new);

        let user_agents = if settings.user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
        } else {
            settings.user_agents.clone()
        };

        Ok(Self {
            direct,
            settings,
            proxy_source,
            user_agents,
            next_agent: AtomicUsize::new(0),
            ledger,
            cancel,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetches a text document
    ///
    /// The returned [`Document`] carries the final URL after redirects and
    /// the encoding its body was decoded with.
    pub async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let user_agent = self.next_user_agent();
        self.with_retry(url, move |read_timeout| {
            self.fetch_once(url, user_agent, read_timeout)
        })
        .await
    }

    /// Downloads a binary resource to `destination`
    ///
    /// The body is streamed chunk by chunk into a `.part` sibling of `destination`, which
    /// is renamed into place only after the whole body arrived.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of bytes written
    /// * `Err(FetchError)` - The download failed (already recorded in the ledger)
    pub async fn fetch_binary(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let user_agent = self.next_user_agent();
        self.with_retry(url, move |read_timeout| {
            self.download_once(url, user_agent, read_timeout, destination)
        })
        .await
    }

    fn next_user_agent(&self) -> &str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    /// Drives one logical request through the retry policy
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Success | Return immediately |
    /// | Non-retryable failure (e.g. HTTP 404) | Give up |
    /// | First read timeout | Double read timeout, retry without backoff |
    /// | Other retryable failure | Wait `2^n` units, retry |
    /// | Budget exhausted | Record in ledger, return `Exhausted` |
    /// | Cancellation | Return `Cancelled`, nothing recorded |
    async fn with_retry<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut(Duration) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if let Err(e) = Url::parse(url) {
            let error = FetchError::InvalidUrl(format!("{}: {}", url, e));
            self.ledger.record(url, error.to_string());
            return Err(error);
        }

        let policy = &self.settings.retry;
        let mut state = RetryState::new(policy, self.settings.read_timeout);
        let mut last_error = None;

        while state.has_attempts_left() {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let attempt_number = state.attempts();
            let result = tokio::select! {
                _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
                result = attempt(state.read_timeout()) => result,
            };

            let error = match result {
                Ok(value) => {
                    if attempt_number > 0 {
                        tracing::debug!("{} succeeded on attempt {}", url, attempt_number + 1);
                    }
                    return Ok(value);
                }
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(error) => error,
            };

            state.record_failure();
            tracing::warn!("Attempt {} for {} failed: {}", attempt_number + 1, url, error);

            let retryable = error.is_retryable();
            let timed_out = error.is_timeout();
            last_error = Some(error);

            if !retryable {
                break;
            }

            if timed_out && state.escalate(policy) {
                tracing::info!(
                    "Read timeout escalated to {:?} for {}",
                    state.read_timeout(),
                    url
                );
                continue;
            }

            if state.has_attempts_left() {
                let delay = policy.backoff_delay(attempt_number);
                tracing::debug!("Backing off {:?} before retrying {}", delay, url);
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        let last = last_error.unwrap_or_else(|| FetchError::Transport("no attempt made".to_string()));
        let failure = FetchError::Exhausted {
            attempts: state.attempts(),
            last: Box::new(last),
        };

        tracing::error!("Giving up on {}: {}", url, failure);
        self.ledger.record(url, failure.to_string());

        Err(failure)
    }

    /// Picks the client for one attempt, querying the proxy source if configured
    async fn client_for_attempt(&self) -> Result<Client, FetchError> {
        let Some(source) = &self.proxy_source else {
            return Ok(self.direct.clone());
        };

        let proxy_url = source
            .next_proxy(&self.direct, self.settings.read_timeout)
            .await?;
        tracing::debug!("Routing through proxy {}", proxy_url);

        build_http_client(self.settings.connect_timeout, Some(&proxy_url))
            .map_err(|e| FetchError::Proxy(format!("{}: {}", proxy_url, e)))
    }

    async fn send(
        &self,
        url: &str,
        user_agent: &str,
        read_timeout: Duration,
    ) -> Result<Response, FetchError> {
        let client = self.client_for_attempt().await?;

        let response = client
            .get(url)
            .header(USER_AGENT, user_agent)
            .timeout(read_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, read_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn fetch_once(
        &self,
        url: &str,
        user_agent: &str,
        read_timeout: Duration,
    ) -> Result<Document, FetchError> {
        tracing::debug!("Fetching {}", url);
        let response = self.send(url, user_agent, read_timeout).await?;

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, read_timeout))?;

        let declared = detect_encoding(content_type.as_deref(), &bytes);
        let (body, encoding) = decode_body(&bytes, declared);

        Ok(Document {
            url: final_url,
            body,
            encoding,
        })
    }

    async fn download_once(
        &self,
        url: &str,
        user_agent: &str,
        read_timeout: Duration,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        tracing::debug!("Downloading {} to {}", url, destination.display());
        let mut response = self.send(url, user_agent, read_timeout).await?;

        let partial = partial_path(destination);
        match stream_to_file(&mut response, &partial, read_timeout).await {
            Ok(written) => {
                tokio::fs::rename(&partial, destination)
                    .await
                    .map_err(|e| io_error(destination, e))?;
                Ok(written)
            }
            Err(error) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(error)
            }
        }
    }
}

async fn stream_to_file(
    response: &mut Response,
    path: &Path,
    read_timeout: Duration,
) -> Result<u64, FetchError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| io_error(path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::from_reqwest(e, read_timeout))?
    {
        file.write_all(&chunk).await.map_err(|e| io_error(path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| io_error(path, e))?;
    Ok(written)
}

/// Sequence keeping concurrent downloads of one image apart
static PART_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `<destination>.<n>.part`, next to the destination
fn partial_path(destination: &Path) -> PathBuf {
    let sequence = PART_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", sequence));
    destination.with_file_name(name)
}

fn io_error(path: &Path, error: std::io::Error) -> FetchError {
    FetchError::Io {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
