//! Content-addressed output storage
//!
//! Every asset of a run lands in one flat directory: `<key>.html` documents,
//! `<sha256>.<ext>` images, the TOC snapshot and the run report. Files are
//! written to a `.part` sibling first and renamed into place, so readers
//! never observe a half-written asset.

mod content;
mod naming;
mod snapshot;

pub use content::{ContentStore, StoredAsset};
pub use naming::{
    content_key, document_file_name, image_extension, image_file_name, is_content_addressed,
    KEY_LENGTH,
};
pub use snapshot::TocSnapshot;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting or loading assets
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize TOC snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to parse TOC snapshot {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
