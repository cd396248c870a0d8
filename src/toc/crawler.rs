//! Paginated listing crawler
//!
//! The crawl is a small state machine: fetch the current listing page,
//! extract entry links, then follow the next-page link if one is configured
//! and present. Traversal stops when there is no next page, when a page
//! repeats, when `max-pages` is reached, or when a listing page keeps
//! failing.

use crate::config::Config;
use crate::fetch::{Document, FetchClient, FetchError};
use crate::query::DocumentQuery;
use crate::store::content_key;
use crate::toc::{clean_title, fallback_title, ListingPage, Toc, TocEntry};
use crate::url::{parse_target_url, resolve_link};
use crate::{BinderError, Result};
use std::collections::HashSet;
use url::Url;

/// Parameters of one TOC crawl
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub start_url: Url,
    pub link_selector: String,
    pub next_page_selector: Option<String>,
    pub max_pages: usize,
    /// Full fetch calls spent on one listing page before giving up on it
    pub page_attempts: u32,
}

impl CrawlRequest {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            start_url: parse_target_url(&config.target.url)?,
            link_selector: config.target.link_selector.clone(),
            next_page_selector: config.target.next_page_selector.clone(),
            max_pages: config.target.max_pages,
            page_attempts: config.pipeline.listing_page_attempts,
        })
    }
}

/// Builds a [`Toc`] from a paginated listing
pub struct TocCrawler<'a> {
    client: &'a FetchClient,
    query: &'a dyn DocumentQuery,
}

impl<'a> TocCrawler<'a> {
    pub fn new(client: &'a FetchClient, query: &'a dyn DocumentQuery) -> Self {
        Self { client, query }
    }

    /// Crawls the listing described by `request`
    ///
    /// # Returns
    ///
    /// * `Ok(Toc)` - Entries in listing order (possibly empty)
    /// * `Err(BinderError::ListingUnavailable)` - The first page could not be fetched
    /// * `Err(BinderError::Query)` - The link or next-page rule is invalid
    /// * `Err(BinderError::Cancelled)` - The run was cancelled mid-crawl
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<Toc> {
        let mut toc = Toc::new(request.start_url.as_str());
        let mut visited: HashSet<String> = HashSet::new();
        let mut target = Some(request.start_url.clone());

        while let Some(page_url) = target.take() {
            if toc.pages().len() >= request.max_pages {
                tracing::warn!(
                    "Stopping at {} listing pages (max-pages reached)",
                    request.max_pages
                );
                break;
            }

            if !visited.insert(page_url.as_str().to_string()) {
                tracing::info!("Listing page {} already visited, stopping", page_url);
                break;
            }

            let document = match self.fetch_listing(&page_url, request.page_attempts).await {
                Ok(document) => document,
                Err(FetchError::Cancelled) => return Err(BinderError::Cancelled),
                Err(source) if toc.pages().is_empty() => {
                    return Err(BinderError::ListingUnavailable {
                        url: page_url.to_string(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Listing page {} unavailable ({}), keeping {} entries found so far",
                        page_url,
                        e,
                        toc.len()
                    );
                    break;
                }
            };

            // A redirect to an already crawled page is a cycle too
            if document.url != page_url && !visited.insert(document.url.as_str().to_string()) {
                tracing::info!(
                    "{} redirected to already visited {}, stopping",
                    page_url,
                    document.url
                );
                break;
            }

            let added = collect_entries(self.query, &document, &request.link_selector, &mut toc)?;
            tracing::info!(
                "Listing page {} ({}): {} new entries",
                document.url,
                document.encoding_name(),
                added
            );

            toc.record_page(ListingPage {
                url: document.url.to_string(),
                encoding: document.encoding_name().to_string(),
                entries: added,
            });

            target = match &request.next_page_selector {
                Some(rule) => self.next_page(&document, rule)?,
                None => None,
            };
        }

        Ok(toc)
    }

    /// Fetches one listing page, retrying the whole fetch call if needed
    async fn fetch_listing(&self, url: &Url, attempts: u32) -> std::result::Result<Document, FetchError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.client.fetch(url.as_str()).await {
                Ok(document) => return Ok(document),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Listing page {} failed ({}), trying again ({}/{})",
                        url,
                        e,
                        attempt + 1,
                        attempts
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn next_page(&self, document: &Document, rule: &str) -> Result<Option<Url>> {
        let Some(link) = self.query.first_link(&document.body, rule)? else {
            tracing::debug!("No next-page link on {}", document.url);
            return Ok(None);
        };

        let next = link
            .href
            .as_deref()
            .and_then(|href| resolve_link(href, &document.url));

        if next.is_none() {
            tracing::debug!("Next-page link on {} has no usable href", document.url);
        }

        Ok(next)
    }
}

/// Appends the entries linked from one listing page
///
/// Links resolve against the document's final URL. Links without a usable
/// href are skipped; URLs already in the TOC are dropped.
///
/// # Returns
///
/// The number of entries actually added.
pub fn collect_entries(
    query: &dyn DocumentQuery,
    document: &Document,
    rule: &str,
    toc: &mut Toc,
) -> Result<usize> {
    let mut added = 0;

    for link in query.links(&document.body, rule)? {
        let Some(href) = link.href.as_deref() else {
            continue;
        };
        let Some(url) = resolve_link(href, &document.url) else {
            tracing::debug!("Skipping link '{}' on {}", href, document.url);
            continue;
        };

        let mut title = clean_title(&link.text);
        if title.is_empty() {
            title = fallback_title(&content_key(url.as_str()));
        }

        if toc.push(TocEntry::new(title, url.as_str())) {
            added += 1;
        } else {
            tracing::debug!("Duplicate entry {} dropped", url);
        }
    }

    Ok(added)
}
