//! Strata Transaction
//!
//! Scoped graph transactions and advisory entity locking.
//!
//! Responsibilities:
//! - Track the prior state of touched vertices (transaction buffer)
//! - Commit or roll back on every exit path, including panics
//! - Run completion hooks after commit or rollback
//! - Serialize concurrent mutations of the same entities

mod buffer;
mod error;
mod lock;
mod manager;

pub use buffer::{PendingWrite, TransactionBuffer};
pub use error::{TransactionError, TransactionResult};
pub use lock::{EntityLockGuard, EntityLockManager};
pub use manager::{in_transaction, Outcome, Transaction, TransactionState};
