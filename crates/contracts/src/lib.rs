//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! worker traits, dispatch configuration, and the unified error type.
//! Business crates may only depend on this crate, reverse dependencies
//! are prohibited.

mod config;
mod error;
mod worker;

pub use config::*;
pub use error::*;
pub use worker::*;
