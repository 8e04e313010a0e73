mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use clap::Parser;
use snip_shortener::ShortenerService;
use snip_storage::{open_store, PgStoreConfig, StoreConfig};
use snip_worker::{DeletionWorker, WorkerConfig};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;

    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        deletion_batch_limit = config.deletion_batch_limit,
        "starting shortener"
    );

    let store = open_store(&store_config(&config)?).await?;

    let (queue, receiver) = snip_worker::channel(config.deletion_queue_capacity as usize);
    let service = ShortenerService::new(store.clone(), queue);
    service.ping().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_config = WorkerConfig::builder()
        .batch_limit(config.deletion_batch_limit as usize)
        .flush_interval(Duration::from_secs(config.deletion_flush_interval_secs))
        .shutdown_grace(Duration::from_secs(config.shutdown_grace_secs))
        .build();
    let worker = DeletionWorker::new(store, receiver, worker_config).spawn(shutdown_rx);

    info!("shortener ready");
    shutdown_signal().await?;
    info!("shutdown requested, draining deletion queue");

    // Producers go first so the worker sees every request sent before the signal.
    drop(service);
    if shutdown_tx.send(true).is_err() {
        warn!("deletion worker exited before shutdown");
    }
    worker.await?;

    info!("shortener stopped");
    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormatArg::Json => builder.json().init(),
        LogFormatArg::Text => builder.init(),
    }
}

fn store_config(config: &CLI) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let store_config = match config.storage {
        StorageBackendArg::Memory => StoreConfig::Memory,
        StorageBackendArg::File => StoreConfig::File {
            path: config.file_storage_path.clone(),
        },
        StorageBackendArg::Postgres => {
            let dsn = config
                .database_dsn
                .clone()
                .ok_or("database dsn is required when storage backend is postgres")?;
            StoreConfig::Postgres(
                PgStoreConfig::builder()
                    .database_url(dsn)
                    .max_connections(config.database_max_connections)
                    .build(),
            )
        }
    };

    Ok(store_config)
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
