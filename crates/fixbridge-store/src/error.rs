//! Error types for fixbridge-store.

use thiserror::Error;

/// Store error types.
///
/// Store failures are transient from the schedulers' point of view: they are
/// logged, the affected cycle is skipped, and the next cycle retries with
/// fresh data.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Row not found: {0}")]
    NotFound(i64),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
