//! Scoped graph transactions.

use crate::buffer::TransactionBuffer;
use strata_core::{GraphResult, Guid, Value};
use strata_graph::{GraphStore, Vertex};
use tracing::{debug, warn};

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    RolledBack,
}

/// Transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active.
    Active,
    /// Transaction was committed.
    Committed,
    /// Transaction was rolled back.
    RolledBack,
}

type CompletionHook = Box<dyn FnOnce(Outcome)>;

/// A scoped transaction over a graph store.
///
/// Writes are applied to the graph immediately and the prior state of each
/// touched vertex is kept in a buffer. Dropping an active transaction rolls
/// it back, so an early return or a panic never leaves partial writes.
pub struct Transaction<'g, G: GraphStore> {
    graph: &'g mut G,
    buffer: TransactionBuffer,
    state: TransactionState,
    hooks: Vec<CompletionHook>,
}

impl<'g, G: GraphStore> Transaction<'g, G> {
    /// Begin a transaction.
    pub fn begin(graph: &'g mut G) -> Self {
        Self {
            graph,
            buffer: TransactionBuffer::new(),
            state: TransactionState::Active,
            hooks: Vec::new(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of distinct vertices written so far.
    pub fn touched(&self) -> usize {
        self.buffer.len()
    }

    /// Register a callback run once the transaction commits or rolls back.
    pub fn on_complete(&mut self, hook: impl FnOnce(Outcome) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Commit the transaction.
    pub fn commit(mut self) {
        debug!(touched = self.buffer.len(), "commit");
        self.buffer.clear();
        self.state = TransactionState::Committed;
        self.complete(Outcome::Committed);
    }

    /// Roll back the transaction.
    pub fn rollback(mut self) {
        self.do_rollback();
    }

    fn do_rollback(&mut self) {
        debug!(touched = self.buffer.len(), "rollback");
        let writes: Vec<_> = self.buffer.drain_reversed().collect();
        for write in writes {
            let restored = match write.previous {
                Some(vertex) => self.graph.put_vertex(vertex),
                None => self.graph.remove_vertex(&write.guid).map(|_| ()),
            };
            if let Err(e) = restored {
                warn!(guid = %write.guid, error = %e, "failed to restore vertex during rollback");
            }
        }
        self.state = TransactionState::RolledBack;
        self.complete(Outcome::RolledBack);
    }

    fn complete(&mut self, outcome: Outcome) {
        for hook in self.hooks.drain(..) {
            hook(outcome);
        }
    }
}

impl<G: GraphStore> Drop for Transaction<'_, G> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            if std::thread::panicking() {
                warn!("rolling back transaction after panic");
            }
            self.do_rollback();
        }
    }
}

impl<G: GraphStore> GraphStore for Transaction<'_, G> {
    fn get_vertex(&self, guid: &Guid) -> Option<&Vertex> {
        self.graph.get_vertex(guid)
    }

    fn find_by_unique_attribute(
        &self,
        type_name: &str,
        attr_name: &str,
        value: &Value,
    ) -> Option<&Vertex> {
        self.graph.find_by_unique_attribute(type_name, attr_name, value)
    }

    fn vertex_guids_of_type(&self, type_name: &str) -> Vec<Guid> {
        self.graph.vertex_guids_of_type(type_name)
    }

    fn all_vertex_guids(&self) -> Vec<Guid> {
        self.graph.all_vertex_guids()
    }

    fn put_vertex(&mut self, vertex: Vertex) -> GraphResult<()> {
        self.buffer
            .record(&vertex.guid, self.graph.get_vertex(&vertex.guid));
        self.graph.put_vertex(vertex)
    }

    fn remove_vertex(&mut self, guid: &Guid) -> GraphResult<Vertex> {
        self.buffer.record(guid, self.graph.get_vertex(guid));
        self.graph.remove_vertex(guid)
    }
}

/// Run `work` inside a transaction: commit if it returns `Ok`, roll back if
/// it returns `Err` or panics.
pub fn in_transaction<G, T, E, F>(graph: &mut G, work: F) -> Result<T, E>
where
    G: GraphStore,
    F: FnOnce(&mut Transaction<'_, G>) -> Result<T, E>,
{
    let mut tx = Transaction::begin(graph);
    match work(&mut tx) {
        Ok(value) => {
            tx.commit();
            Ok(value)
        }
        Err(e) => {
            tx.rollback();
            Err(e)
        }
    }
}
