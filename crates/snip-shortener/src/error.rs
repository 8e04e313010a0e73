use snip_core::{CoreError, StoreError};
use snip_worker::QueueClosed;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("batch is empty")]
    EmptyBatch,
    #[error("deletion queue is closed")]
    QueueClosed,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
        }
    }
}

impl From<QueueClosed> for ShortenerError {
    fn from(_: QueueClosed) -> Self {
        Self::QueueClosed
    }
}
