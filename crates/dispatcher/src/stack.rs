//! PushStack - bounded LIFO variant
//!
//! Items are served newest-first, one per worker invocation. Overload
//! always evicts from the bottom of the stack: the evicted item is the
//! oldest buffered one, regardless of pop order, and the incoming item
//! takes its place on top.

use std::marker::PhantomData;
use std::sync::Arc;

use contracts::{ContractError, DispatchConfig, Worker};

use crate::error::DispatchError;
use crate::handle::PutHandle;
use crate::machine::{DispatchCore, ExtractOrder};
use crate::metrics::DispatchMetrics;
use crate::pool::{SingleItem, WorkerPool};

/// Builder for a [`PushStack`].
pub struct PushStackBuilder<T, W> {
    config: DispatchConfig,
    worker: Option<W>,
    _marker: PhantomData<fn(T)>,
}

impl<T, W> PushStackBuilder<T, W> {
    /// Create a builder from a configuration.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            worker: None,
            _marker: PhantomData,
        }
    }

    /// Set the worker that will process stack items.
    pub fn worker(mut self, worker: W) -> Self {
        self.worker = Some(worker);
        self
    }
}

impl<T, W> PushStackBuilder<T, W>
where
    T: Send + 'static,
    W: Worker<T> + Sync + 'static,
{
    /// Build the stack and spawn its worker pool.
    ///
    /// Must be called inside a Tokio runtime. The stack starts in the
    /// stopped phase; call [`PushStack::start`] to begin processing.
    ///
    /// # Errors
    /// Fails on invalid bounds or when no worker was set.
    pub fn build(self) -> Result<PushStack<T>, DispatchError> {
        self.config.validate()?;
        let worker = self.worker.ok_or(ContractError::MissingWorker)?;

        let core = Arc::new(DispatchCore::new(&self.config, ExtractOrder::NewestFirst, 1));
        // The stack has a fixed overload policy: evict the bottom.
        core.set_drop_oldest(true);
        let pool = WorkerPool::spawn(Arc::clone(&core), SingleItem(worker));
        Ok(PushStack { core, pool })
    }
}

/// A bounded LIFO stack that pushes work to a fixed pool of workers.
///
/// Same machine as [`PushQueue`](crate::PushQueue) with newest-first
/// extraction. Useful when the most recent item is the most valuable
/// one and stale items may be sacrificed under overload.
pub struct PushStack<T: Send + 'static> {
    core: Arc<DispatchCore<T>>,
    pool: WorkerPool<T>,
}

impl<T: Send + 'static> PushStack<T> {
    /// Create a stack with the given concurrency and capacity.
    ///
    /// # Errors
    /// Fails when concurrency or capacity is zero.
    pub fn new<W>(concurrency: usize, capacity: usize, worker: W) -> Result<Self, DispatchError>
    where
        W: Worker<T> + Sync + 'static,
    {
        PushStackBuilder::new(DispatchConfig::new(concurrency, capacity))
            .worker(worker)
            .build()
    }

    /// Push an item onto the stack for processing.
    pub fn push(&self, item: T) {
        self.core.put(item);
    }

    /// Begin stack processing. Resets the overload counter; items
    /// buffered while stopped stay and start dispatching.
    pub fn start(&self) {
        self.core.start();
    }

    /// End processing of stack items from any phase. Abandons an
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

    /// True when the stack cannot accept new items
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

    /// Called with the evicted item on every overload.
    pub fn on_overload<F>(&self, hook: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.core.set_on_overload(hook);
    }

    /// Called with the evicted item on the first overload of a start
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

    /// Producer view of this stack: insert and observe only.
    pub fn handle(&self) -> PutHandle<T> {
        PutHandle::new(Arc::clone(&self.core))
    }

    /// Get current metrics
    pub fn metrics(&self) -> &DispatchMetrics {
        self.core.metrics()
    }

    /// Shut the stack down and wait for the worker tasks to exit.
    /// In-flight worker invocations run to completion.
    pub async fn shutdown(self) {
        let Self { core: _, pool } = self;
        pool.shutdown().await;
    }
}
