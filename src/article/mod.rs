//! Per-article download and image localization
//!
//! [`ArticleDownloader`] turns one TOC entry into one stored document. It
//! delegates embedded images to [`ImageResolver`], which rewrites the
//! fragment to reference locally stored copies.

mod downloader;
mod images;

pub use downloader::{ArticleDownloader, EntryFailure, ExtractionRules, FailureStage, StoredDocument};
pub use images::{ImageResolver, ResolvedFragment};
