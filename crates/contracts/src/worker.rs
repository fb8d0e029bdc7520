//! Worker traits - item processing interface
//!
//! Defines the abstract interface a client supplies to consume
//! dispatched work. The dispatcher invokes the worker once per
//! dispatched unit and ignores whatever the worker does beyond
//! eventually returning; failures inside `process` (including panics)
//! are the client's responsibility to guard.

/// Single-item worker, used by the queue and stack variants.
///
/// `process` may be invoked concurrently up to the configured
/// concurrency, so implementations share state through `&self`.
#[trait_variant::make(Worker: Send)]
pub trait LocalWorker<T> {
    /// Process one dispatched item
    async fn process(&self, item: T);
}

/// Batch worker, used by the batch queue variant.
///
/// Receives between 1 and `batch_size` items in extraction order.
#[trait_variant::make(BatchWorker: Send)]
pub trait LocalBatchWorker<T> {
    /// Process one dispatched batch, oldest item first
    async fn process(&self, items: Vec<T>);
}
