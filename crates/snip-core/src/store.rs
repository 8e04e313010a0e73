use crate::error::Result;
use crate::record::{DeletionRequest, ItemRequest, ItemResponse, UrlRecord};
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Upper bound on short code generation attempts for a single record.
///
/// With 62^6 possible codes this is never reached in practice; past it a
/// backend returns [`StoreError::GeneratorExhausted`](crate::StoreError).
pub const MAX_GENERATION_ATTEMPTS: usize = 64;

/// Outcome of adding a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    /// A new record was created with this code.
    Created(ShortCode),
    /// The owner already had a live record for this URL (the "link exists" signal).
    Existing(ShortCode),
}

impl Shortened {
    pub fn code(&self) -> &ShortCode {
        match self {
            Shortened::Created(code) | Shortened::Existing(code) => code,
        }
    }

    pub fn into_code(self) -> ShortCode {
        match self {
            Shortened::Created(code) | Shortened::Existing(code) => code,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Shortened::Existing(_))
    }
}

/// Result of looking up a short code.
///
/// Distinguishes "never existed" from "existed but deleted" so the caller
/// can answer with "gone" rather than "not found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Active(String),
    Gone(String),
}

impl Resolution {
    pub fn exists(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Resolution::Gone(_))
    }

    /// The stored URL, present for both live and deleted records.
    pub fn original_url(&self) -> Option<&str> {
        match self {
            Resolution::NotFound => None,
            Resolution::Active(url) | Resolution::Gone(url) => Some(url),
        }
    }
}

/// The storage contract every backend implements.
///
/// Backends serialize their own writes; a single instance is shared by all
/// request handlers and the deletion worker.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Shortens `original_url` for `user_id`.
    ///
    /// Returns [`Shortened::Existing`] with the current code when the user
    /// already has a live record for the URL.
    async fn add_url(&self, original_url: &str, user_id: &str) -> Result<Shortened>;

    /// Shortens every item for `user_id`.
    ///
    /// Items that fail individually are logged and left out of the response.
    /// Response order is not guaranteed to match request order.
    async fn add_urls(&self, items: &[ItemRequest], user_id: &str) -> Result<Vec<ItemResponse>>;

    /// Looks up a short code. Reads are not restricted to the owner.
    async fn get_original_url(&self, code: &ShortCode, user_id: &str) -> Result<Resolution>;

    /// Lists the live records owned by `user_id`, ordered by short code.
    ///
    /// Soft-deleted records are left out; an unknown user gets an empty list.
    async fn user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>>;

    /// Checks that the backing medium is reachable.
    async fn ping(&self) -> Result<()>;

    /// Soft-deletes every code owned by its paired user.
    ///
    /// Unknown codes and codes owned by someone else are ignored.
    async fn delete_urls(&self, batch: &[DeletionRequest]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_flags() {
        assert!(!Resolution::NotFound.exists());
        assert!(!Resolution::NotFound.is_deleted());
        assert_eq!(Resolution::NotFound.original_url(), None);

        let active = Resolution::Active("https://example.com".to_string());
        assert!(active.exists());
        assert!(!active.is_deleted());

        let gone = Resolution::Gone("https://example.com".to_string());
        assert!(gone.exists());
        assert!(gone.is_deleted());
        assert_eq!(gone.original_url(), Some("https://example.com"));
    }

    #[test]
    fn shortened_exposes_code() {
        let code = ShortCode::new_unchecked("abc123");
        assert!(!Shortened::Created(code.clone()).is_existing());
        assert!(Shortened::Existing(code.clone()).is_existing());
        assert_eq!(Shortened::Existing(code.clone()).into_code(), code);
    }

    #[test]
    fn store_is_object_safe() {
        fn assert_dyn(_: Option<&dyn Store>) {}
        assert_dyn(None);
    }
}
