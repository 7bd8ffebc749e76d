//! Transaction error types.

use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Advisory entity locks could not be acquired in time.
    #[error("timed out after {waited_ms}ms waiting for entity locks: {guids}")]
    LockTimeout { guids: String, waited_ms: u64 },
}

impl TransactionError {
    pub fn lock_timeout(guids: impl Into<String>, waited_ms: u64) -> Self {
        Self::LockTimeout {
            guids: guids.into(),
            waited_ms,
        }
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
