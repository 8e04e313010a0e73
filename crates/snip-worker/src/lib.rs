//! Batched soft deletion of short URLs.
//!
//! Request handlers push [`DeletionRequest`](snip_core::DeletionRequest)s into a
//! bounded [`DeletionQueue`]; a single [`DeletionWorker`] accumulates them and
//! hands whole batches to the store.

pub mod queue;
pub mod worker;

pub use queue::{channel, DeletionQueue, QueueClosed};
pub use worker::{DeletionWorker, WorkerConfig};
