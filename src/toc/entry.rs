//! Table of contents data model

use crate::store::content_key;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One discovered content item
///
/// Fields are private so an entry cannot change after creation; in
/// particular `content_key` is always the key of `source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TocEntry {
    title: String,
    source_url: String,
    content_key: String,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        let content_key = content_key(&source_url);
        Self {
            title: title.into(),
            source_url,
            content_key,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn content_key(&self) -> &str {
        &self.content_key
    }
}

/// A listing page visited while building the TOC
///
/// The encoding is kept per page; pages of one listing may disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingPage {
    pub url: String,
    pub encoding: String,
    /// New entries contributed by this page after deduplication
    pub entries: usize,
}

/// Ordered table of contents, unique by content key
///
/// Insertion order is listing order, which is also final book order. When
/// the same URL is linked twice the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct Toc {
    source: String,
    entries: Vec<TocEntry>,
    pages: Vec<ListingPage>,
    keys: HashSet<String>,
}

impl Toc {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Rebuilds a TOC from persisted parts
    ///
    /// Keys are recomputed from the URLs and duplicates dropped, so a
    /// hand-edited snapshot cannot break the uniqueness invariant.
    pub fn from_parts(
        source: impl Into<String>,
        pages: Vec<ListingPage>,
        entries: Vec<TocEntry>,
    ) -> Self {
        let mut toc = Self::new(source);
        toc.pages = pages;
        for entry in entries {
            let rebuilt = TocEntry::new(entry.title, entry.source_url);
            if rebuilt.content_key != entry.content_key {
                tracing::warn!(
                    "Snapshot key for {} did not match its URL, recomputed",
                    rebuilt.source_url
                );
            }
            toc.push(rebuilt);
        }
        toc
    }

    /// Appends an entry unless its key is already present
    ///
    /// Returns true if the entry was added.
    pub fn push(&mut self, entry: TocEntry) -> bool {
        if !self.keys.insert(entry.content_key.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn record_page(&mut self, page: ListingPage) {
        self.pages.push(page);
    }

    /// URL the crawl started from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn pages(&self) -> &[ListingPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
