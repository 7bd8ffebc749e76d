//! Transaction buffer for tracking the prior state of touched vertices.

use std::collections::HashSet;
use strata_core::Guid;
use strata_graph::Vertex;

/// Prior state of a vertex touched by the transaction.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    /// The vertex GUID.
    pub guid: Guid,
    /// The vertex as it was before the first write, `None` if it was created.
    pub previous: Option<Vertex>,
}

/// Transaction buffer that tracks how to undo uncommitted changes.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuffer {
    writes: Vec<PendingWrite>,
    touched: HashSet<Guid>,
}

impl TransactionBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state of a vertex before it is written. Only the first
    /// write per GUID is kept.
    pub fn record(&mut self, guid: &Guid, previous: Option<&Vertex>) {
        if self.touched.insert(guid.clone()) {
            self.writes.push(PendingWrite {
                guid: guid.clone(),
                previous: previous.cloned(),
            });
        }
    }

    /// Number of distinct vertices touched.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Drain the recorded writes, most recent first.
    pub fn drain_reversed(&mut self) -> impl Iterator<Item = PendingWrite> + '_ {
        self.touched.clear();
        self.writes.drain(..).rev()
    }

    pub fn clear(&mut self) {
        self.writes.clear();
        self.touched.clear();
    }
}
