//! Contract-level error definitions
//!
//! Construction-time precondition violations only. Overload is a normal
//! operating condition and is deliberately not represented here.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContractError {
    /// Worker concurrency must be at least 1
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    /// Buffer capacity must be at least 1
    #[error("capacity must be at least 1")]
    InvalidCapacity,

    /// Batch size must be at least 1
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// No worker was configured before build
    #[error("no worker configured")]
    MissingWorker,
}
