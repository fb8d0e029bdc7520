//! Dispatch configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Configuration for a push dispatcher instance.
///
/// All fields are fixed once the dispatcher is built, except the
/// overload disposal policy which may still be toggled before `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of simultaneous worker invocations
    pub concurrency: usize,

    /// Maximum number of buffered items
    pub capacity: usize,

    /// Items pulled per dispatch (1 for queue/stack variants)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// On overload, evict the oldest buffered item instead of
    /// dropping the incoming one
    #[serde(default)]
    pub drop_oldest_on_overload: bool,
}

fn default_batch_size() -> usize {
    1
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            capacity: 1024,
            batch_size: 1,
            drop_oldest_on_overload: false,
        }
    }
}

impl DispatchConfig {
    /// Create a configuration with the given concurrency and capacity,
    /// defaults for everything else.
    pub fn new(concurrency: usize, capacity: usize) -> Self {
        Self {
            concurrency,
            capacity,
            ..Self::default()
        }
    }

    /// Set the number of items pulled per dispatch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable oldest-first eviction on overload.
    pub fn with_drop_oldest_on_overload(mut self) -> Self {
        self.drop_oldest_on_overload = true;
        self
    }

    /// Check construction-time bounds.
    ///
    /// # Errors
    /// Returns the first violated bound.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.concurrency < 1 {
            return Err(ContractError::InvalidConcurrency);
        }
        if self.capacity < 1 {
            return Err(ContractError::InvalidCapacity);
        }
        if self.batch_size < 1 {
            return Err(ContractError::InvalidBatchSize);
        }
        Ok(())
    }
}
