//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Invalid construction parameters (from contract)
    #[error("dispatch configuration error: {0}")]
    Contract(#[from] contracts::ContractError),
}
