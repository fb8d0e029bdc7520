//! PutHandle - capability-restricted producer view
//!
//! The only surface handed to producers: insert and observe, no
//! lifecycle control. Cloneable and cheap, one `Arc` deep.

use std::sync::Arc;

use crate::machine::DispatchCore;

/// Producer handle to a running dispatcher.
///
/// Obtained from the owning variant via `handle()`. Producers can put
/// items and query buffer state but cannot start, stop or drain the
/// machine.
pub struct PutHandle<T: Send + 'static> {
    core: Arc<DispatchCore<T>>,
}

impl<T: Send + 'static> PutHandle<T> {
    pub(crate) fn new(core: Arc<DispatchCore<T>>) -> Self {
        Self { core }
    }

    /// Add an item for processing. Never blocks; on overload the item
    /// (or the oldest buffered one, by policy) is dropped and reported
    /// through the owner's overload hooks.
    pub fn put(&self, item: T) {
        self.core.put(item);
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

    /// True when the next put would overload
    pub fn is_full(&self) -> bool {
        self.core.is_full()
    }

    /// True while the machine accepts and processes items
    pub fn is_started(&self) -> bool {
        self.core.is_started()
    }
}

impl<T: Send + 'static> Clone for PutHandle<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}
