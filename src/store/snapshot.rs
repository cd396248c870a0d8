//! Persisted TOC snapshot
//!
//! Written once after the crawl, before any article is fetched. The file is
//! plain TOML so it can be inspected or edited between runs:
//!
//! ```toml
//! generated-at = "2024-05-01T12:00:00Z"
//! source = "https://blog.example/"
//!
//! [[pages]]
//! url = "https://blog.example/"
//! encoding = "UTF-8"
//! entries = 2
//!
//! [[entries]]
//! title = "First-post"
//! source-url = "https://blog.example/post/1"
//! content-key = "..."
//! ```

use crate::toc::{ListingPage, Toc, TocEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TocSnapshot {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub pages: Vec<ListingPage>,
    #[serde(default)]
    pub entries: Vec<TocEntry>,
}

impl TocSnapshot {
    pub fn from_toc(toc: &Toc) -> Self {
        Self {
            generated_at: Utc::now(),
            source: toc.source().to_string(),
            pages: toc.pages().to_vec(),
            entries: toc.entries().to_vec(),
        }
    }

    pub fn into_toc(self) -> Toc {
        Toc::from_parts(self.source, self.pages, self.entries)
    }
}
