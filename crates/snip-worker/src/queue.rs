use snip_core::DeletionRequest;
use thiserror::Error;
use tokio::sync::mpsc;

/// Returned when the worker side of the queue has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deletion queue is closed")]
pub struct QueueClosed;

/// Producer handle for pending deletions.
///
/// Cheap to clone; the worker's channel closes once every handle is dropped.
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    tx: mpsc::Sender<DeletionRequest>,
}

/// Creates a bounded deletion queue and the receiver its worker consumes.
///
/// A capacity of zero is bumped to one.
pub fn channel(capacity: usize) -> (DeletionQueue, mpsc::Receiver<DeletionRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DeletionQueue { tx }, rx)
}

impl DeletionQueue {
    /// Queues one request, waiting for room when the queue is full.
    pub async fn enqueue(&self, request: DeletionRequest) -> Result<(), QueueClosed> {
        self.tx.send(request).await.map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
