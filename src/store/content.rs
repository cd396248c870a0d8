use crate::fetch::{encode_text, persisted_encoding};
use crate::store::naming::{document_file_name, image_file_name, is_content_addressed};
use crate::store::snapshot::TocSnapshot;
use crate::store::{StoreError, StoreResult};
use crate::toc::Toc;
use encoding_rs::Encoding;
use std::path::{Path, PathBuf};
use url::Url;

/// A file written to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub path: PathBuf,
    /// Bare file name, as referenced from sibling documents
    pub file_name: String,
    pub bytes: u64,
}

/// Flat output directory shared by every worker of a run
///
/// Paths derive from content keys, so concurrent writers in a correct run
/// never target the same file and no locking is needed.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the output directory if needed
    pub async fn prepare(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::Write {
                path: self.root.clone(),
                source,
            })
    }

    pub fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(document_file_name(key))
    }

    /// File name and full path an image URL is stored under
    pub fn image_location(&self, url: &Url) -> (String, PathBuf) {
        let file_name = image_file_name(url);
        let path = self.root.join(&file_name);
        (file_name, path)
    }

    pub async fn has_document(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.document_path(key))
            .await
            .unwrap_or(false)
    }

    /// Returns true if `reference` names an image already stored here
    ///
    /// Only bare content-addressed names qualify, so a reference can never
    /// point outside the output directory.
    pub fn is_local_asset(&self, reference: &str) -> bool {
        is_content_addressed(reference) && self.root.join(reference).is_file()
    }

    /// Persists an article fragment in the encoding its page was served in
    pub async fn write_document(
        &self,
        key: &str,
        content: &str,
        encoding: &'static Encoding,
    ) -> StoreResult<StoredAsset> {
        let file_name = document_file_name(key);
        let path = self.root.join(&file_name);
        let bytes = encode_text(content, encoding);

        write_atomic(&path, &bytes).await?;
        tracing::debug!(
            "Stored {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            persisted_encoding(encoding).name()
        );

        Ok(StoredAsset {
            path,
            file_name,
            bytes: bytes.len() as u64,
        })
    }

    /// Writes the TOC snapshot under `file_name`
    pub async fn write_snapshot(&self, file_name: &str, toc: &Toc) -> StoreResult<PathBuf> {
        let text = toml::to_string(&TocSnapshot::from_toc(toc))?;
        self.write_text(file_name, &text).await
    }

    /// Loads a snapshot written by [`ContentStore::write_snapshot`]
    pub async fn load_snapshot(&self, file_name: &str) -> StoreResult<Toc> {
        let path = self.root.join(file_name);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;

        let snapshot: TocSnapshot =
            toml::from_str(&text).map_err(|source| StoreError::Parse { path, source })?;
        Ok(snapshot.into_toc())
    }

    /// Writes a UTF-8 text file into the output directory
    pub async fn write_text(&self, file_name: &str, text: &str) -> StoreResult<PathBuf> {
        let path = self.root.join(file_name);
        write_atomic(&path, text.as_bytes()).await?;
        Ok(path)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let write_error = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(write_error(e));
    }

    tokio::fs::rename(&partial, path).await.map_err(write_error)
}
