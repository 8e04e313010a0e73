//! Store backends for the Snip URL shortener.
//!
//! Three interchangeable implementations of [`Store`]:
//! [`MemoryStore`] (process-local maps), [`FileStore`] (maps mirrored to a
//! JSON-lines file) and [`PgStore`] (PostgreSQL). [`open_store`] picks one
//! at startup from a [`StoreConfig`].

pub mod file;
pub mod memory;
pub mod postgres;
pub mod select;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreConfig};
pub use select::{open_store, StoreConfig};
pub use snip_core::{Resolution, Shortened, Store, StoreError};
