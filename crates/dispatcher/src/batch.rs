//! PushBatchQueue - bounded FIFO variant with batched extraction
//!
//! Insertion and overload behave exactly like [`PushQueue`]; only the
//! dispatch step changes: each worker invocation receives up to
//! `batch_size` items, oldest first.
//!
//! [`PushQueue`]: crate::PushQueue

use std::marker::PhantomData;
use std::sync::Arc;

use contracts::{BatchWorker, ContractError, DispatchConfig};

use crate::error::DispatchError;
use crate::handle::PutHandle;
use crate::machine::{DispatchCore, ExtractOrder};
use crate::metrics::DispatchMetrics;
use crate::pool::{Batched, WorkerPool};

/// Builder for a [`PushBatchQueue`].
pub struct PushBatchQueueBuilder<T, W> {
    config: DispatchConfig,
    worker: Option<W>,
    _marker: PhantomData<fn(T)>,
}

impl<T, W> PushBatchQueueBuilder<T, W> {
    /// Create a builder from a configuration; `config.batch_size`
    /// controls the extraction granularity.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            worker: None,
            _marker: PhantomData,
        }
    }

    /// Set the worker that will process item batches.
    pub fn worker(mut self, worker: W) -> Self {
        self.worker = Some(worker);
        self
    }
}

impl<T, W> PushBatchQueueBuilder<T, W>
where
    T: Send + 'static,
    W: BatchWorker<T> + Sync + 'static,
{
    /// Build the batch queue and spawn its worker pool.
    ///
    /// Must be called inside a Tokio runtime. The queue starts in the
    /// stopped phase; call [`PushBatchQueue::start`] to begin
    /// processing.
    ///
    /// # Errors
    /// Fails on invalid bounds or when no worker was set.
    pub fn build(self) -> Result<PushBatchQueue<T>, DispatchError> {
        self.config.validate()?;
        let worker = self.worker.ok_or(ContractError::MissingWorker)?;

        let batch_size = self.config.batch_size;
        let core = Arc::new(DispatchCore::new(
            &self.config,
            ExtractOrder::OldestFirst,
            batch_size,
        ));
        let pool = WorkerPool::spawn(Arc::clone(&core), Batched(worker));
        Ok(PushBatchQueue { core, pool })
    }
}

/// A bounded FIFO queue that hands workers batches of items.
///
/// Each dispatch pulls `min(batch_size, buffered)` items and invokes
/// the worker once with the whole batch, in insertion order. Batching
/// amortizes per-invocation cost when items are cheap and frequent.
pub struct PushBatchQueue<T: Send + 'static> {
    core: Arc<DispatchCore<T>>,
    pool: WorkerPool<T>,
}

impl<T: Send + 'static> PushBatchQueue<T> {
    /// Create a batch queue with the given concurrency, capacity and
    /// batch size.
    ///
    /// # Errors
    /// Fails when concurrency, capacity or batch size is zero.
    pub fn new<W>(
        concurrency: usize,
        capacity: usize,
        batch_size: usize,
        worker: W,
    ) -> Result<Self, DispatchError>
    where
        W: BatchWorker<T> + Sync + 'static,
    {
        PushBatchQueueBuilder::new(
            DispatchConfig::new(concurrency, capacity).with_batch_size(batch_size),
        )
        .worker(worker)
        .build()
    }

    /// Add an item to the queue for processing.
    pub fn put(&self, item: T) {
        self.core.put(item);
    }

    /// Begin queue processing. Resets the overload counter; items
    /// buffered while stopped stay and start dispatching.
    pub fn start(&self) {
        self.core.start();
    }

    /// End processing of queue items from any phase. Abandons an
    /// active drain without firing the drained hook.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Process remaining items and reject new ones; fires the drained
    /// hook once the buffer is empty and all workers are idle.
    pub fn drain(&self) {
        self.core.drain();
    }

    /// Discard all buffered items without touching the lifecycle
    /// phase, the overload counter or worker slots.
    pub fn clear(&self) {
        self.core.clear();
    }

    /// Current number of buffered items
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// True when no items are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered items
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// True when the queue cannot accept new items
    pub fn is_full(&self) -> bool {
        self.core.is_full()
    }

    /// True while started; false when stopped or draining
    pub fn is_started(&self) -> bool {
        self.core.is_started()
    }

    /// Number of overloads since the last start
    pub fn overload_count(&self) -> u64 {
        self.core.overload_count()
    }

    /// On overload, evict the oldest buffered item instead of dropping
    /// the incoming one. Intended to be set before `start`.
    pub fn set_drop_oldest_on_overload(&self, enabled: bool) {
        self.core.set_drop_oldest(enabled);
    }

    /// Called with the dropped item on every overload.
    pub fn on_overload<F>(&self, hook: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.core.set_on_overload(hook);
    }

    /// Called with the dropped item on the first overload of a start
    /// cycle.
    pub fn on_first_overload<F>(&self, hook: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.core.set_on_first_overload(hook);
    }

    /// Called once when a drain cycle completes.
    pub fn on_drained<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.core.set_on_drained(hook);
    }

    /// Producer view of this queue: insert and observe only.
    pub fn handle(&self) -> PutHandle<T> {
        PutHandle::new(Arc::clone(&self.core))
    }

    /// Get current metrics
    pub fn metrics(&self) -> &DispatchMetrics {
        self.core.metrics()
    }

    /// Shut the queue down and wait for the worker tasks to exit.
    /// In-flight worker invocations run to completion.
    pub async fn shutdown(self) {
        let Self { core: _, pool } = self;
        pool.shutdown().await;
    }
}
