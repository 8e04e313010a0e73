use snip_core::{DeletionRequest, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Batching and timing knobs for [`DeletionWorker`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct WorkerConfig {
    /// Pending requests that trigger an immediate flush.
    #[builder(default = 100)]
    pub batch_limit: usize,
    /// Idle period after which a non-empty batch is flushed.
    #[builder(default = Duration::from_secs(5))]
    pub flush_interval: Duration,
    /// Upper bound on draining and flushing once shutdown starts.
    #[builder(default = Duration::from_secs(5))]
    pub shutdown_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Accumulates deletion requests and flushes them to the store in batches.
///
/// A batch is flushed when it reaches `batch_limit`, on every
/// `flush_interval` tick, and once more on shutdown or channel closure.
/// Flush failures are logged and the batch is dropped; retrying is left to
/// the store.
pub struct DeletionWorker {
    store: Arc<dyn Store>,
    receiver: mpsc::Receiver<DeletionRequest>,
    config: WorkerConfig,
    pending: Vec<DeletionRequest>,
}

impl DeletionWorker {
    pub fn new(
        store: Arc<dyn Store>,
        receiver: mpsc::Receiver<DeletionRequest>,
        config: WorkerConfig,
    ) -> Self {
        let batch_limit = config.batch_limit.max(1);
        // `interval_at` panics on a zero period.
        let flush_interval = config.flush_interval.max(MIN_FLUSH_INTERVAL);
        Self {
            store,
            receiver,
            config: WorkerConfig {
                batch_limit,
                flush_interval,
                ..config
            },
            pending: Vec::with_capacity(batch_limit),
        }
    }

    /// Runs the worker on its own task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Runs until `shutdown` flips to `true` (or its sender is dropped) or
    /// every queue handle is dropped, then drains and flushes what is left.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.flush_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            batch_limit = self.config.batch_limit,
            flush_interval_ms = period.as_millis() as u64,
            "deletion worker started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                debug!("deletion worker received shutdown signal");
                break;
            }

            tokio::select! {
                received = self.receiver.recv() => match received {
                    Some(request) => {
                        self.pending.push(request);
                        if self.pending.len() >= self.config.batch_limit {
                            self.flush("batch_limit").await;
                            ticker.reset();
                        }
                    }
                    None => {
                        debug!("deletion queue closed by producers");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.pending.is_empty() {
                        self.flush("interval").await;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        self.finish().await;
    }

    async fn finish(&mut self) {
        // Producers blocked on a full queue get `QueueClosed` from here on;
        // everything already buffered is still delivered.
        self.receiver.close();

        let grace = self.config.shutdown_grace;
        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            error!(
                grace_ms = grace.as_millis() as u64,
                "deletion flush did not finish before the shutdown deadline"
            );
        }

        info!("deletion worker stopped");
    }

    async fn drain(&mut self) {
        while let Some(request) = self.receiver.recv().await {
            self.pending.push(request);
            if self.pending.len() >= self.config.batch_limit {
                self.flush("batch_limit").await;
            }
        }

        if !self.pending.is_empty() {
            self.flush("shutdown").await;
        }
    }

    async fn flush(&mut self, reason: &'static str) {
        let batch = std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(self.config.batch_limit),
        );
        let count = batch.len();

        match self.store.delete_urls(&batch).await {
            Ok(()) => info!(count, reason, "flushed deletion batch"),
            Err(err) => error!(count, reason, error = %err, "failed to flush deletion batch"),
        }
    }
}
