use crate::error::ShortenerError;
use snip_core::{
    DeletionRequest, ItemRequest, ItemResponse, Resolution, ShortCode, Shortened, Store, UrlRecord,
};
use snip_worker::DeletionQueue;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for request handlers.
///
/// Wraps the shared [`Store`] and the producer side of the deletion queue:
/// - URL validation before anything reaches the store
/// - malformed short codes resolve to [`Resolution::NotFound`]
/// - deletions are queued, not applied inline
#[derive(Clone)]
pub struct ShortenerService {
    store: Arc<dyn Store>,
    deletions: DeletionQueue,
}

impl ShortenerService {
    pub fn new(store: Arc<dyn Store>, deletions: DeletionQueue) -> Self {
        Self { store, deletions }
    }

    /// Validates that the URL has an http(s) scheme and a host.
    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {}",
                url
            )));
        };

        let scheme = scheme.to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                scheme
            )));
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a host: {}",
                url
            )));
        }

        Ok(())
    }

    /// Shortens one URL. [`Shortened::Existing`] means the user already owns
    /// a live link for it.
    pub async fn shorten(
        &self,
        original_url: &str,
        user_id: &str,
    ) -> Result<Shortened, ShortenerError> {
        Self::validate_url(original_url)?;
        Ok(self.store.add_url(original_url, user_id).await?)
    }

    /// Shortens a batch. Any invalid URL rejects the whole batch; store-level
    /// failures on single items only drop those items from the response.
    pub async fn shorten_batch(
        &self,
        items: &[ItemRequest],
        user_id: &str,
    ) -> Result<Vec<ItemResponse>, ShortenerError> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }
        for item in items {
            Self::validate_url(&item.original_url)?;
        }

        Ok(self.store.add_urls(items, user_id).await?)
    }

    /// Looks up a short code for any caller.
    pub async fn resolve(&self, code: &str, user_id: &str) -> Result<Resolution, ShortenerError> {
        let Ok(code) = ShortCode::new(code) else {
            debug!(code, "malformed short code");
            return Ok(Resolution::NotFound);
        };

        Ok(self.store.get_original_url(&code, user_id).await?)
    }

    /// Queues the user's codes for soft deletion and returns how many were
    /// queued. Malformed codes cannot match a record and are skipped.
    ///
    /// Waits while the queue is full.
    pub async fn delete_urls(
        &self,
        codes: &[String],
        user_id: &str,
    ) -> Result<usize, ShortenerError> {
        let mut queued = 0;

        for code in codes {
            let Ok(short_code) = ShortCode::new(code.as_str()) else {
                debug!(code = %code, "skipping malformed short code");
                continue;
            };

            self.deletions
                .enqueue(DeletionRequest::new(short_code, user_id))
                .await?;
            queued += 1;
        }

        info!(user_id, queued, "queued urls for deletion");
        Ok(queued)
    }

    /// Lists the caller's live links. An empty list means "no content".
    pub async fn user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>, ShortenerError> {
        Ok(self.store.user_urls(user_id).await?)
    }

    pub async fn ping(&self) -> Result<(), ShortenerError> {
        Ok(self.store.ping().await?)
    }
}
