//! Image localization for extracted fragments

use crate::fetch::{FetchClient, FetchError};
use crate::query::{DocumentQuery, ImageAction};
use crate::store::ContentStore;
use crate::url::resolve_image_source;
use std::collections::HashMap;
use url::Url;

/// A fragment after image localization
#[derive(Debug, Clone, Default)]
pub struct ResolvedFragment {
    /// Rewritten fragment
    pub html: String,

    /// Local file names now referenced by the fragment
    pub stored: Vec<String>,

    /// Image sources dropped because they could not be retrieved
    pub removed: Vec<String>,
}

/// Downloads the images of a fragment and points them at local copies
///
/// Images that cannot be resolved or downloaded are removed from the
/// fragment. Images already referencing a stored file and `data:` URIs are
/// left alone, so resolving a fragment twice changes nothing the second time.
pub struct ImageResolver<'a> {
    client: &'a FetchClient,
    store: &'a ContentStore,
    query: &'a dyn DocumentQuery,
}

impl<'a> ImageResolver<'a> {
    pub fn new(client: &'a FetchClient, store: &'a ContentStore, query: &'a dyn DocumentQuery) -> Self {
        Self {
            client,
            store,
            query,
        }
    }

    /// Localizes every image of `fragment`, resolving sources against `base_url`
    ///
    /// Download failures are not errors here (they are already in the
    /// failure ledger); the only error is cancellation.
    pub async fn resolve(&self, fragment: &str, base_url: &Url) -> Result<ResolvedFragment, FetchError> {
        let scan = self.query.image_sources(fragment);
        if scan.missing_src > 0 {
            tracing::debug!("{} image(s) without src on {}", scan.missing_src, base_url);
        }

        let mut actions: HashMap<String, ImageAction> = HashMap::new();
        let mut resolved = ResolvedFragment::default();

        for src in scan.sources {
            if actions.contains_key(&src) {
                continue;
            }

            let action = self.localize(&src, base_url, &mut resolved).await?;
            actions.insert(src, action);
        }

        resolved.html = self.query.rewrite_images(fragment, &actions);
        Ok(resolved)
    }

    async fn localize(
        &self,
        src: &str,
        base_url: &Url,
        resolved: &mut ResolvedFragment,
    ) -> Result<ImageAction, FetchError> {
        let reference = src.trim();

        if reference.starts_with("data:") {
            return Ok(ImageAction::Keep);
        }

        if self.store.is_local_asset(reference) {
            resolved.stored.push(reference.to_string());
            return Ok(ImageAction::Keep);
        }

        let Some(url) = resolve_image_source(reference, base_url) else {
            tracing::warn!("Dropping unresolvable image '{}' on {}", src, base_url);
            resolved.removed.push(src.to_string());
            return Ok(ImageAction::Remove);
        };

        let (file_name, path) = self.store.image_location(&url);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("Image {} already stored as {}", url, file_name);
        } else {
            match self.client.fetch_binary(url.as_str(), &path).await {
                Ok(bytes) => tracing::debug!("Stored image {} as {} ({} bytes)", url, file_name, bytes),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => {
                    tracing::warn!("Removing image {} from {}: {}", url, base_url, e);
                    resolved.removed.push(src.to_string());
                    return Ok(ImageAction::Remove);
                }
            }
        }

        resolved.stored.push(file_name.clone());
        Ok(ImageAction::Replace(file_name))
    }
}
