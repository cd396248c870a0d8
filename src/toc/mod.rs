//! Table of contents discovery
//!
//! Walks a paginated listing, turns matched links into ordered, deduplicated
//! [`TocEntry`] values and remembers which listing page contributed what.

mod crawler;
mod entry;
mod title;

pub use crawler::{collect_entries, CrawlRequest, TocCrawler};
pub use entry::{ListingPage, Toc, TocEntry};
pub use title::{clean_title, fallback_title, is_safe_char};
