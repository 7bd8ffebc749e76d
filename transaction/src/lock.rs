//! Advisory per-entity locks.
//!
//! Locks are taken on a set of GUIDs all-or-nothing, so two callers locking
//! overlapping sets cannot deadlock against each other. The guard releases
//! its GUIDs when dropped; callers hand it to a transaction completion hook
//! so the release happens after commit or rollback.

use crate::{TransactionError, TransactionResult};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use strata_core::Guid;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct LockTable {
    locked: Mutex<HashSet<Guid>>,
    released: Condvar,
}

impl LockTable {
    fn lock_set(&self) -> MutexGuard<'_, HashSet<Guid>> {
        self.locked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Hands out advisory locks on entity GUIDs.
#[derive(Debug, Clone, Default)]
pub struct EntityLockManager {
    table: Arc<LockTable>,
}

impl EntityLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every GUID in `guids`, waiting up to `timeout` for holders to
    /// release them.
    pub fn lock<I>(&self, guids: I, timeout: Duration) -> TransactionResult<EntityLockGuard>
    where
        I: IntoIterator<Item = Guid>,
    {
        let guids: BTreeSet<Guid> = guids.into_iter().filter(|g| !g.is_empty()).collect();
        let deadline = Instant::now() + timeout;
        let mut locked = self.table.lock_set();

        while guids.iter().any(|g| locked.contains(g)) {
            let now = Instant::now();
            if now >= deadline {
                let names: Vec<&str> = guids.iter().map(Guid::as_str).collect();
                warn!(guids = ?names, "entity lock timeout");
                return Err(TransactionError::lock_timeout(
                    names.join(","),
                    timeout.as_millis() as u64,
                ));
            }
            let (guard, _) = self
                .table
                .released
                .wait_timeout(locked, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locked = guard;
        }

        locked.extend(guids.iter().cloned());
        debug!(count = guids.len(), "entity locks acquired");

        Ok(EntityLockGuard {
            table: self.table.clone(),
            guids: guids.into_iter().collect(),
        })
    }

    /// Whether a GUID is currently locked.
    pub fn is_locked(&self, guid: &Guid) -> bool {
        self.table.lock_set().contains(guid)
    }
}

/// Releases its GUIDs on drop.
#[derive(Debug)]
pub struct EntityLockGuard {
    table: Arc<LockTable>,
    guids: Vec<Guid>,
}

impl EntityLockGuard {
    pub fn guids(&self) -> &[Guid] {
        &self.guids
    }
}

impl Drop for EntityLockGuard {
    fn drop(&mut self) {
        let mut locked = self.table.lock_set();
        for guid in &self.guids {
            locked.remove(guid);
        }
        drop(locked);
        self.table.released.notify_all();
    }
}
