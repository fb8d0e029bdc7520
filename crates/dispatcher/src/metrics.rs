//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single dispatcher instance
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current buffer depth
    queue_depth: AtomicUsize,
    /// Total items handed to workers
    dispatched_items: AtomicU64,
    /// Total worker invocations (extraction units)
    dispatched_units: AtomicU64,
    /// Total items dropped on overload
    dropped_count: AtomicU64,
    /// Completed drain cycles
    drain_count: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current buffer depth
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    /// Set current buffer depth
    pub(crate) fn set_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Get total dispatched item count
    pub fn dispatched_items(&self) -> u64 {
        self.dispatched_items.load(Ordering::Relaxed)
    }

    /// Get total worker invocation count
    pub fn dispatched_units(&self) -> u64 {
        self.dispatched_units.load(Ordering::Relaxed)
    }

    /// Record one dispatched unit of `items` items
    pub(crate) fn inc_dispatched(&self, items: u64) {
        self.dispatched_units.fetch_add(1, Ordering::Relaxed);
        self.dispatched_items.fetch_add(items, Ordering::Relaxed);
    }

    /// Get dropped item count
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped item count
    pub(crate) fn inc_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get completed drain cycle count
    pub fn drain_count(&self) -> u64 {
        self.drain_count.load(Ordering::Relaxed)
    }

    /// Increment completed drain cycle count
    pub(crate) fn inc_drains(&self) {
        self.drain_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_depth: self.queue_depth(),
            dispatched_items: self.dispatched_items(),
            dispatched_units: self.dispatched_units(),
            dropped_count: self.dropped_count(),
            drain_count: self.drain_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub queue_depth: usize,
    pub dispatched_items: u64,
    pub dispatched_units: u64,
    pub dropped_count: u64,
    pub drain_count: u64,
}
