//! Resilient HTTP fetching
//!
//! This module contains everything the harvest needs to talk to the network:
//! - Building HTTP clients and rotating user agents
//! - Retry with exponential backoff and read-timeout escalation
//! - Per-attempt proxy resolution from a proxy source
//! - Character encoding resolution for fetched documents
//! - Streaming binary downloads straight to disk
//! - A shared ledger of exhausted failures for end-of-run reporting

mod client;
mod encoding;
mod ledger;
mod proxy;
mod retry;

pub use client::{build_http_client, FetchClient, FetchSettings, DEFAULT_USER_AGENTS};
pub use encoding::{decode_body, detect_encoding, encode_text, persisted_encoding};
pub use ledger::{FailureLedger, FailureRecord};
pub use proxy::{normalize_proxy_address, ProxySource};
pub use retry::{RetryPolicy, RetryState};

use encoding_rs::Encoding;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure of a single fetch call
///
/// Expected network failures are values of this type, never panics. The
/// client classifies each one with [`FetchError::is_retryable`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("proxy source unavailable: {0}")]
    Proxy(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to write {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Classifies an error from reqwest
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchError::Timeout { timeout }
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport(error.to_string())
        }
    }

    /// Returns true if the failure is transient and another attempt may succeed
    ///
    /// | Failure | Retryable |
    /// |---------|-----------|
    /// | Timeout, connect, transport | yes |
    /// | Proxy source unavailable | yes |
    /// | HTTP 408, 429, 5xx | yes |
    /// | Other HTTP status | no |
    /// | Invalid URL, disk write, cancellation | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Connect(_)
            | FetchError::Transport(_)
            | FetchError::Proxy(_) => true,
            FetchError::Status { status } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            FetchError::InvalidUrl(_)
            | FetchError::Io { .. }
            | FetchError::Cancelled
            | FetchError::Exhausted { .. } => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// The innermost error, looking through [`FetchError::Exhausted`]
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

/// A successfully fetched text document
///
/// Owned by the call that produced it. `encoding` is the character set the
/// body was decoded with; anything persisted from this document must be
/// written back in the same encoding.
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects
    pub url: Url,

    /// Decoded body text
    pub body: String,

    /// Resolved character encoding
    pub encoding: &'static Encoding,
}

impl Document {
    /// Canonical name of the document's encoding (e.g. `UTF-8`, `GBK`)
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encoding anything persisted from this document is written in
    pub fn persisted_encoding(&self) -> &'static Encoding {
        encoding::persisted_encoding(self.encoding)
    }
}
