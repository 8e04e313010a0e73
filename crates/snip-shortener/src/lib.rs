//! URL shortener service.
//!
//! [`ShortenerService`] sits between a transport layer and the storage core:
//! it validates input, maps lookups to [`Resolution`](snip_core::Resolution)s
//! and fans deletions out into the background deletion queue.

pub mod error;
pub mod service;

pub use error::ShortenerError;
pub use service::ShortenerService;
