//! Core types and traits for the Snip URL shortener.
//!
//! This crate defines the storage contract shared by every backend
//! (memory, file, PostgreSQL) together with the records and signals
//! that flow across it.

pub mod error;
pub mod record;
pub mod shortcode;
pub mod store;

pub use error::{CoreError, StoreError};
pub use record::{DeletionRequest, ItemRequest, ItemResponse, UrlRecord};
pub use shortcode::ShortCode;
pub use store::{Resolution, Shortened, Store, MAX_GENERATION_ATTEMPTS};
