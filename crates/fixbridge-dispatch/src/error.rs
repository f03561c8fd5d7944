//! Dispatch error types.
//!
//! The scheduler has no caller, so none of these ever propagate out of the
//! loop; they classify per-order failures so the loop can decide between
//! "skip this row" and "session is gone, stop the batch".

use fixbridge_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No established venue session")]
    SessionUnavailable,

    #[error("Transport send failed: {0}")]
    SendFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(&'static str),
}

impl DispatchError {
    /// True when the failure means the venue session is gone and the rest
    /// of the batch cannot be sent either.
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self,
            Self::SessionUnavailable | Self::SendFailed(_) | Self::Timeout(_)
        )
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
