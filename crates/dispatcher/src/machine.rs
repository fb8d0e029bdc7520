//! Generalized dispatch state machine
//!
//! One mutex-guarded state block backs all three public variants:
//! buffer, idle-worker accounting, lifecycle phase and overload counter
//! change together as a single atomic unit. Dispatch is level-triggered:
//! insertion, worker completion, `start` and `drain` all wake the pool,
//! and a woken worker re-checks the guard under the lock before
//! extracting anything, so redundant wakeups are harmless.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, warn};

use contracts::DispatchConfig;

use crate::metrics::DispatchMetrics;

/// End of the buffer a dispatch step extracts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExtractOrder {
    /// Head of the buffer (queue semantics)
    OldestFirst,
    /// Tail of the buffer (stack semantics)
    NewestFirst,
}

/// Lifecycle phase of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Running,
    Draining,
}

type ItemHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type DrainedHook = Arc<dyn Fn() + Send + Sync>;

struct Hooks<T> {
    on_overload: Option<ItemHook<T>>,
    on_first_overload: Option<ItemHook<T>>,
    on_drained: Option<DrainedHook>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            on_overload: None,
            on_first_overload: None,
            on_drained: None,
        }
    }
}

/// Mutable state, guarded by a single mutex.
struct CoreState<T> {
    items: VecDeque<T>,
    idle_workers: usize,
    phase: Phase,
    overload_count: u64,
    drop_oldest: bool,
    hooks: Hooks<T>,
}

impl<T> CoreState<T> {
    /// Dispatch guard: a phase that allows dispatching, a free worker
    /// slot, and at least one buffered item.
    fn ready_to_work(&self) -> bool {
        matches!(self.phase, Phase::Running | Phase::Draining)
            && self.idle_workers > 0
            && !self.items.is_empty()
    }
}

/// The dispatch core shared between the public variant types, the
/// producer handles and the worker pool.
pub(crate) struct DispatchCore<T> {
    concurrency: usize,
    capacity: usize,
    batch_size: usize,
    order: ExtractOrder,
    inner: Mutex<CoreState<T>>,
    wake: Notify,
    closed: AtomicBool,
    metrics: Arc<DispatchMetrics>,
    /// Captured at construction so hooks can be spawned from plain OS
    /// threads holding a producer handle.
    runtime: Handle,
}

impl<T: Send + 'static> DispatchCore<T> {
    /// Must be called inside a Tokio runtime; the runtime handle is
    /// captured here and drives the hook tasks later.
    pub(crate) fn new(config: &DispatchConfig, order: ExtractOrder, batch_size: usize) -> Self {
        Self {
            concurrency: config.concurrency,
            capacity: config.capacity,
            batch_size,
            order,
            inner: Mutex::new(CoreState {
                items: VecDeque::with_capacity(config.capacity),
                idle_workers: config.concurrency,
                phase: Phase::Stopped,
                overload_count: 0,
                drop_oldest: config.drop_oldest_on_overload,
                hooks: Hooks::default(),
            }),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
            metrics: Arc::new(DispatchMetrics::new()),
            runtime: Handle::current(),
        }
    }

    /// Hooks and workers never run under the lock, so a poisoned guard
    /// only means a panic in plain data mutation; the state is still
    /// consistent and can be recovered.
    fn lock(&self) -> MutexGuard<'_, CoreState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Insertion =====

    /// Add an item for processing.
    ///
    /// Never blocks and never fails. When the machine is draining or
    /// the buffer is at capacity this is an overload: one item (the
    /// incoming one, or the oldest buffered one under the drop-oldest
    /// policy) is dropped and handed to the overload hooks. A dispatch
    /// attempt is triggered in every branch.
    pub(crate) fn put(&self, item: T) {
        let mut st = self.lock();

        if st.phase == Phase::Draining || st.items.len() >= self.capacity {
            let dropped = if st.drop_oldest {
                match st.items.pop_front() {
                    Some(oldest) => {
                        st.items.push_back(item);
                        oldest
                    }
                    // Draining with an empty buffer: nothing to evict,
                    // the incoming item is the one dropped.
                    None => item,
                }
            } else {
                item
            };

            st.overload_count += 1;
            let overloads = st.overload_count;
            let every = st.hooks.on_overload.clone();
            let first = if overloads == 1 {
                st.hooks.on_first_overload.clone()
            } else {
                None
            };
            drop(st);

            self.metrics.inc_dropped();
            warn!(overloads, "buffer overloaded, item dropped");
            self.wake.notify_one();
            self.fire_overload_hooks(every, first, dropped);
            return;
        }

        st.items.push_back(item);
        let depth = st.items.len();
        drop(st);

        self.metrics.set_depth(depth);
        self.wake.notify_one();
    }

    fn fire_overload_hooks(
        &self,
        every: Option<ItemHook<T>>,
        first: Option<ItemHook<T>>,
        dropped: T,
    ) {
        if every.is_none() && first.is_none() {
            return;
        }
        // Spawned through the captured handle: `put` stays panic-free
        // on producer threads outside the runtime.
        self.runtime.spawn(async move {
            if let Some(hook) = every {
                hook(&dropped);
            }
            if let Some(hook) = first {
                hook(&dropped);
            }
        });
    }

    // ===== Dispatch =====

    /// One dispatch step: take an extraction unit if the guard holds.
    ///
    /// Consumes a worker slot on success; the caller must pair every
    /// successful take with a [`complete`](Self::complete) call.
    pub(crate) fn try_take(&self) -> Option<Vec<T>> {
        let mut st = self.lock();
        if !st.ready_to_work() {
            return None;
        }

        st.idle_workers -= 1;
        let count = self.batch_size.min(st.items.len());
        let unit: Vec<T> = match self.order {
            ExtractOrder::OldestFirst => st.items.drain(..count).collect(),
            ExtractOrder::NewestFirst => {
                let split = st.items.len() - count;
                st.items.split_off(split).into_iter().rev().collect()
            }
        };
        let depth = st.items.len();
        drop(st);

        self.metrics.set_depth(depth);
        self.metrics.inc_dispatched(unit.len() as u64);
        Some(unit)
    }

    /// Return a worker slot after the worker finished its unit.
    ///
    /// This is the authoritative place drain completion is detected:
    /// all slots idle and the buffer empty while draining ends the
    /// drain cycle exactly once, because the phase flips to `Stopped`
    /// under the same lock.
    pub(crate) fn complete(&self) {
        let mut st = self.lock();
        if st.idle_workers < self.concurrency {
            st.idle_workers += 1;
        }

        if st.idle_workers == self.concurrency
            && st.items.is_empty()
            && st.phase == Phase::Draining
        {
            let hook = finish_drain(&mut st);
            drop(st);
            self.notify_drained(hook);
            return;
        }

        let draining = st.phase == Phase::Draining;
        drop(st);
        if !draining {
            self.wake.notify_one();
        }
    }

    // ===== Lifecycle =====

    /// Begin processing. Resets the overload counter and triggers a
    /// dispatch attempt for anything buffered while stopped.
    pub(crate) fn start(&self) {
        let mut st = self.lock();
        st.phase = Phase::Running;
        st.overload_count = 0;
        drop(st);

        debug!("dispatch started");
        self.wake.notify_waiters();
    }

    /// Stop processing from any phase. In-flight workers run to
    /// completion; an active drain is abandoned without firing its
    /// drained hook.
    pub(crate) fn stop(&self) {
        let mut st = self.lock();
        st.phase = Phase::Stopped;
        drop(st);

        debug!("dispatch stopped");
    }

    /// Reject new items and keep dispatching until quiescent.
    ///
    /// If the machine is already quiescent the drained transition
    /// fires immediately, otherwise the last completing worker fires
    /// it from [`complete`](Self::complete).
    pub(crate) fn drain(&self) {
        let mut st = self.lock();
        if st.items.is_empty() && st.idle_workers == self.concurrency {
            let hook = finish_drain(&mut st);
            drop(st);
            self.notify_drained(hook);
            return;
        }

        st.phase = Phase::Draining;
        let depth = st.items.len();
        drop(st);

        debug!(depth, "draining");
        self.wake.notify_waiters();
    }

    fn notify_drained(&self, hook: Option<DrainedHook>) {
        self.metrics.inc_drains();
        debug!("drain complete");
        if let Some(hook) = hook {
            self.runtime.spawn(async move { hook() });
        }
    }

    /// Discard all buffered items. Phase, overload counter and worker
    /// slots are untouched.
    pub(crate) fn clear(&self) {
        let mut st = self.lock();
        st.items.clear();
        drop(st);
        self.metrics.set_depth(0);
    }

    /// Permanently shut the machine down so pool tasks can exit.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// A wakeup future for pool tasks. Must be enabled before
    /// re-checking the guard so no wakeup is lost in between.
    pub(crate) fn wake_signal(&self) -> Notified<'_> {
        self.wake.notified()
    }

    // ===== Hooks and policy =====

    pub(crate) fn set_on_overload<F>(&self, hook: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lock().hooks.on_overload = Some(Arc::new(hook));
    }

    pub(crate) fn set_on_first_overload<F>(&self, hook: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lock().hooks.on_first_overload = Some(Arc::new(hook));
    }

    pub(crate) fn set_on_drained<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock().hooks.on_drained = Some(Arc::new(hook));
    }

    pub(crate) fn set_drop_oldest(&self, enabled: bool) {
        self.lock().drop_oldest = enabled;
    }

    // ===== Queries =====

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// True only while running; a draining machine reports false.
    pub(crate) fn is_started(&self) -> bool {
        self.lock().phase == Phase::Running
    }

    pub(crate) fn overload_count(&self) -> u64 {
        self.lock().overload_count
    }

    pub(crate) fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }
}

/// Ends the drain cycle under the caller's lock and hands back the
/// drained hook to fire outside it.
fn finish_drain<T>(st: &mut CoreState<T>) -> Option<DrainedHook> {
    st.phase = Phase::Stopped;
    st.hooks.on_drained.clone()
}
