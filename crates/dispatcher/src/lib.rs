//! # Dispatcher
//!
//! Bounded, self-driving work distribution: producers put items in, a
//! fixed-size pool of workers drains them automatically. There is no
//! polling loop on either side: every dispatch is triggered by an
//! event (insertion, worker completion, drain).
//!
//! Three variants share one machine:
//! - [`PushQueue`]: oldest-first, one item per worker invocation
//! - [`PushStack`]: newest-first, one item per worker invocation
//! - [`PushBatchQueue`]: oldest-first, up to `batch_size` items per
//!   worker invocation
//!
//! Insertion never blocks and never fails: when the buffer is full or
//! the machine is draining, one item is dropped (incoming by default,
//! oldest under the drop-oldest policy) and reported through the
//! overload hooks.
//!
//! ```ignore
//! use contracts::Worker;
//! use dispatcher::PushQueue;
//!
//! struct Printer;
//!
//! impl Worker<String> for Printer {
//!     async fn process(&self, item: String) {
//!         println!("{item}");
//!     }
//! }
//!
//! let queue = PushQueue::new(2, 50, Printer)?;
//! queue.start();
//!
//! let handle = queue.handle(); // insert-only view for producers
//! handle.put("hello".to_string());
//!
//! queue.drain(); // finish buffered work, then stop
//! queue.shutdown().await;
//! ```

pub mod batch;
pub mod error;
pub mod handle;
mod machine;
pub mod metrics;
mod pool;
pub mod queue;
pub mod stack;

pub use contracts::{BatchWorker, ContractError, DispatchConfig, Worker};

pub use batch::{PushBatchQueue, PushBatchQueueBuilder};
pub use error::DispatchError;
pub use handle::PutHandle;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use queue::{PushQueue, PushQueueBuilder};
pub use stack::{PushStack, PushStackBuilder};
