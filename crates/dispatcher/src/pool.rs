//! Fixed-size worker pool driving the dispatch core
//!
//! One Tokio task per concurrency slot, all parked on the core's
//! notifier. Every loop iteration is one dispatch step: re-check the
//! guard, pull an extraction unit, run the worker outside the lock,
//! return the slot. No task is ever spawned per item, so the
//! concurrency bound holds under bursty insertion.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{BatchWorker, Worker};

use crate::machine::DispatchCore;

/// Internal worker contract over one extraction unit.
pub(crate) trait UnitWorker<T>: Send + Sync + 'static {
    fn process_unit(&self, unit: Vec<T>) -> impl Future<Output = ()> + Send;
}

/// Adapts a single-item [`Worker`] (queue and stack variants).
pub(crate) struct SingleItem<W>(pub(crate) W);

impl<T, W> UnitWorker<T> for SingleItem<W>
where
    T: Send + 'static,
    W: Worker<T> + Sync + 'static,
{
    async fn process_unit(&self, mut unit: Vec<T>) {
        // Queue and stack extract exactly one item per dispatch.
        if let Some(item) = unit.pop() {
            self.0.process(item).await;
        }
    }
}

/// Adapts a [`BatchWorker`] (batch queue variant).
pub(crate) struct Batched<W>(pub(crate) W);

impl<T, W> UnitWorker<T> for Batched<W>
where
    T: Send + 'static,
    W: BatchWorker<T> + Sync + 'static,
{
    async fn process_unit(&self, unit: Vec<T>) {
        self.0.process(unit).await;
    }
}

/// Handle to the spawned worker tasks of one dispatcher.
pub(crate) struct WorkerPool<T: Send + 'static> {
    core: Arc<DispatchCore<T>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn one worker task per concurrency slot.
    pub(crate) fn spawn<W>(core: Arc<DispatchCore<T>>, worker: W) -> Self
    where
        W: UnitWorker<T>,
    {
        let worker = Arc::new(worker);
        let handles = (0..core.concurrency())
            .map(|id| {
                let core = Arc::clone(&core);
                let worker = Arc::clone(&worker);
                tokio::spawn(worker_loop(id, core, worker))
            })
            .collect();
        Self { core, handles }
    }

    /// Close the core and wait for every worker task to exit.
    pub(crate) async fn shutdown(mut self) {
        self.core.close();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = ?e, "dispatch worker task panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // Parked tasks hold the core alive; closing lets them exit
        // even when the owner never called shutdown.
        self.core.close();
    }
}

#[instrument(name = "dispatch_worker", skip(core, worker), fields(worker = id))]
async fn worker_loop<T, W>(id: usize, core: Arc<DispatchCore<T>>, worker: Arc<W>)
where
    T: Send + 'static,
    W: UnitWorker<T>,
{
    debug!("dispatch worker started");

    loop {
        if core.is_closed() {
            break;
        }

        // Arm the wakeup before re-checking the guard so a put/start/
        // drain landing in between is not lost.
        let mut notified = pin!(core.wake_signal());
        notified.as_mut().enable();

        match core.try_take() {
            Some(unit) => {
                worker.process_unit(unit).await;
                core.complete();
            }
            None => notified.await,
        }
    }

    debug!("dispatch worker stopped");
}
