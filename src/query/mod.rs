//! Pluggable document querying
//!
//! Selection rules (link, next-page, content, removal) are opaque strings
//! that only a [`DocumentQuery`] implementation interprets. The pipeline never
//! looks inside them, so the underlying engine can be swapped without
//! touching crawl or download logic. [`ScraperQuery`] is the CSS-selector
//! engine used by default.

mod scraper_query;

pub use scraper_query::ScraperQuery;

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while interpreting a selection rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("selection rule is empty")]
    EmptyRule,

    #[error("invalid selection rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },
}

/// A link element matched by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    /// Raw `href` attribute, if the element has one
    pub href: Option<String>,

    /// Concatenated text content
    pub text: String,
}

/// Image references found in a fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageScan {
    /// `src` values in document order (duplicates included)
    pub sources: Vec<String>,

    /// Image elements without a `src` attribute
    pub missing_src: usize,
}

/// What to do with every image carrying a given `src`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    /// Leave the element untouched
    Keep,

    /// Point the element at a local file name
    Replace(String),

    /// Drop the element from the fragment
    Remove,
}

/// Result of cutting the main region out of a page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Serialized main region, or None if the content rule matched nothing
    pub content: Option<String>,

    /// Removal rules that could not be applied
    pub rule_errors: Vec<QueryError>,
}

/// Document-query capability used by the crawler and the downloader
pub trait DocumentQuery: Send + Sync {
    /// Elements matching `rule`, in document order
    fn links(&self, html: &str, rule: &str) -> Result<Vec<LinkMatch>, QueryError>;

    /// First element matching `rule`
    fn first_link(&self, html: &str, rule: &str) -> Result<Option<LinkMatch>, QueryError> {
        Ok(self.links(html, rule)?.into_iter().next())
    }

    /// Strips every element matched by `remove_rules`, then serializes the
    /// first element matched by `content_rule`
    ///
    /// An invalid content rule is an error; an invalid removal rule is
    /// reported in [`Extraction::rule_errors`] and the remaining rules still
    /// apply.
    fn extract(
        &self,
        html: &str,
        content_rule: &str,
        remove_rules: &[String],
    ) -> Result<Extraction, QueryError>;

    /// Image references inside an HTML fragment
    fn image_sources(&self, fragment: &str) -> ImageScan;

    /// Applies per-`src` actions to the images of a fragment
    ///
    /// Must return `fragment` unchanged when no action modifies anything.
    fn rewrite_images(&self, fragment: &str, actions: &HashMap<String, ImageAction>) -> String;
}
