use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::postgres::{PgStore, PgStoreConfig};
use snip_core::error::Result;
use snip_core::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Which backend to construct at startup.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    File { path: PathBuf },
    Postgres(PgStoreConfig),
}

impl StoreConfig {
    /// Short backend name for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Postgres(_) => "postgres",
        }
    }
}

/// Builds the configured backend.
///
/// Any failure here (unreadable file, unreachable database) should stop the
/// process from starting.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    info!(backend = config.backend(), "opening store");

    let store: Arc<dyn Store> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::File { path } => Arc::new(FileStore::open(path.clone()).await?),
        StoreConfig::Postgres(pg) => Arc::new(PgStore::connect(pg).await?),
    };

    Ok(store)
}
