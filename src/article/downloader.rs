//! Single-entry article download
//!
//! Every failure of an entry is caught here and turned into an
//! [`EntryFailure`] value. Nothing propagates past this boundary, so one
//! broken article never affects its siblings.

use crate::article::images::ImageResolver;
use crate::config::ExtractConfig;
use crate::fetch::{FetchClient, FetchError};
use crate::query::DocumentQuery;
use crate::store::{ContentStore, StoredAsset};
use crate::toc::TocEntry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Rules cutting the main region out of an article page
#[derive(Debug, Clone, Default)]
pub struct ExtractionRules {
    pub content: String,
    pub remove: Vec<String>,
}

impl ExtractionRules {
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            content: config.content_selector.clone(),
            remove: config.remove_selectors.clone(),
        }
    }
}

/// Stage at which an entry failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Content or removal rule unusable
    Rules,
    Fetch,
    /// Content rule matched nothing
    Extract,
    Persist,
    Cancelled,
    /// The download task panicked
    Panicked,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Rules => "rules",
            FailureStage::Fetch => "fetch",
            FailureStage::Extract => "extract",
            FailureStage::Persist => "persist",
            FailureStage::Cancelled => "cancelled",
            FailureStage::Panicked => "worker",
        };
        f.write_str(name)
    }
}

/// Recorded failure of one entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed for {url}: {reason}")]
pub struct EntryFailure {
    pub url: String,
    pub stage: FailureStage,
    pub reason: String,
}

impl EntryFailure {
    fn new(entry: &TocEntry, stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            url: entry.source_url().to_string(),
            stage,
            reason: reason.into(),
        }
    }
}

/// A successfully stored article
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub asset: StoredAsset,
    /// Encoding the document was written in
    pub encoding: &'static str,
    pub images: Vec<String>,
    pub images_removed: usize,
}

/// Downloads TOC entries into the content store
///
/// Cheap to clone; clones share the client, store and query engine.
#[derive(Clone)]
pub struct ArticleDownloader {
    client: Arc<FetchClient>,
    store: Arc<ContentStore>,
    query: Arc<dyn DocumentQuery>,
}

impl ArticleDownloader {
    pub fn new(
        client: Arc<FetchClient>,
        store: Arc<ContentStore>,
        query: Arc<dyn DocumentQuery>,
    ) -> Self {
        Self {
            client,
            store,
            query,
        }
    }

    /// Fetches, extracts, localizes and persists one entry
    ///
    /// The stored document uses the encoding detected for this entry's page.
    pub async fn download_entry(
        &self,
        entry: &TocEntry,
        rules: &ExtractionRules,
    ) -> Result<StoredDocument, EntryFailure> {
        if rules.content.trim().is_empty() {
            return Err(EntryFailure::new(entry, FailureStage::Rules, "content rule is empty"));
        }

        let document = self
            .client
            .fetch(entry.source_url())
            .await
            .map_err(|e| fetch_failure(entry, e))?;

        let extraction = self
            .query
            .extract(&document.body, &rules.content, &rules.remove)
            .map_err(|e| EntryFailure::new(entry, FailureStage::Rules, e.to_string()))?;

        for error in &extraction.rule_errors {
            tracing::warn!("Removal rule skipped for {}: {}", entry.source_url(), error);
        }

        let content = extraction.content.ok_or_else(|| {
            EntryFailure::new(
                entry,
                FailureStage::Extract,
                format!("content rule '{}' matched nothing", rules.content),
            )
        })?;

        let resolver = ImageResolver::new(&self.client, &self.store, self.query.as_ref());
        let resolved = resolver
            .resolve(&content, &document.url)
            .await
            .map_err(|e| fetch_failure(entry, e))?;

        let encoding = document.persisted_encoding();
        let asset = self
            .store
            .write_document(entry.content_key(), &resolved.html, encoding)
            .await
            .map_err(|e| EntryFailure::new(entry, FailureStage::Persist, e.to_string()))?;

        tracing::info!(
            "Stored '{}' as {} ({} image(s), {} removed)",
            entry.title(),
            asset.file_name,
            resolved.stored.len(),
            resolved.removed.len()
        );

        Ok(StoredDocument {
            asset,
            encoding: encoding.name(),
            images: resolved.stored,
            images_removed: resolved.removed.len(),
        })
    }
}

fn fetch_failure(entry: &TocEntry, error: FetchError) -> EntryFailure {
    let stage = if error.is_cancelled() {
        FailureStage::Cancelled
    } else {
        FailureStage::Fetch
    };
    EntryFailure::new(entry, stage, error.to_string())
}
