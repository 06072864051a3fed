//! Error types for cluster drivers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors a driver can report back to the orchestrator.
///
/// The message ends up verbatim on the failed task record, so drivers
/// should make it specific enough to act on.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The infrastructure operation was attempted and failed.
    #[error("{0}")]
    Failed(String),

    /// The driver does not implement this lifecycle action.
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

impl DriverError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
