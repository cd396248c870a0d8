//! Sumi-Binder: harvests a paginated article listing into offline book content
//!
//! This crate implements the content-acquisition side of turning a website's
//! article collection into a packaged book: it crawls a paginated table of
//! contents, downloads every listed article concurrently, localizes embedded
//! images, and leaves normalized HTML fragments plus image files in a single
//! flat output directory for a downstream format writer.

pub mod article;
pub mod config;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod toc;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Binder operations
///
/// Only run-level (fatal) conditions surface through this type. Failures of a
/// single article or image are recorded as values and never abort a run.
#[derive(Debug, Error)]
pub enum BinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Listing page {url} could not be fetched: {source}")]
    ListingUnavailable {
        url: String,
        source: fetch::FetchError,
    },

    #[error("Selector error: {0}")]
    Query(#[from] query::QueryError),

    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("No entries found at {url}")]
    EmptyToc { url: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Binder operations
pub type Result<T> = std::result::Result<T, BinderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FailureLedger, FetchClient, FetchError};
pub use pipeline::{Pipeline, RunMode, RunReport};
pub use store::{content_key, ContentStore};
pub use toc::{Toc, TocEntry};
