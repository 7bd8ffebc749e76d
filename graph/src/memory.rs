//! In-memory graph backend.

use crate::index::{TypeIndex, UniqueIndex, UniqueKey};
use crate::{GraphStore, Vertex};
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{GraphError, GraphResult, Guid, Value};
use strata_registry::Registry;

/// The in-memory vertex storage.
///
/// Unique attributes are taken from the registry and indexed per concrete
/// vertex type. Only active vertices hold unique values, so a soft-deleted
/// entity does not block a new one with the same identity.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    registry: Arc<Registry>,
    /// Vertex storage
    vertices: HashMap<Guid, Vertex>,
    /// Type index
    type_index: TypeIndex,
    /// Unique attribute index
    unique_index: UniqueIndex,
}

impl MemoryGraph {
    /// Create a new empty graph.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            vertices: HashMap::new(),
            type_index: TypeIndex::new(),
            unique_index: UniqueIndex::new(),
        }
    }

    /// Number of vertices in any state.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    fn unique_keys(&self, vertex: &Vertex) -> Vec<UniqueKey> {
        if !vertex.is_active() {
            return Vec::new();
        }
        self.registry
            .unique_attributes(&vertex.type_name)
            .into_iter()
            .filter_map(|def| {
                let value = vertex.attributes.get(&def.name)?;
                UniqueKey::new(&vertex.type_name, &def.name, value)
            })
            .collect()
    }

    fn unindex(&mut self, vertex: &Vertex) {
        self.type_index.remove(&vertex.type_name, &vertex.guid);
        for key in self.unique_keys(vertex) {
            self.unique_index.remove(&key, &vertex.guid);
        }
    }
}

impl GraphStore for MemoryGraph {
    fn get_vertex(&self, guid: &Guid) -> Option<&Vertex> {
        self.vertices.get(guid)
    }

    fn find_by_unique_attribute(
        &self,
        type_name: &str,
        attr_name: &str,
        value: &Value,
    ) -> Option<&Vertex> {
        let key = UniqueKey::new(type_name, attr_name, value)?;
        self.unique_index
            .get(&key)
            .and_then(|guid| self.vertices.get(guid))
    }

    fn vertex_guids_of_type(&self, type_name: &str) -> Vec<Guid> {
        let mut guids: Vec<Guid> = self.type_index.get(type_name).cloned().collect();
        guids.sort();
        guids
    }

    fn all_vertex_guids(&self) -> Vec<Guid> {
        let mut guids: Vec<Guid> = self.vertices.keys().cloned().collect();
        guids.sort();
        guids
    }

    fn put_vertex(&mut self, vertex: Vertex) -> GraphResult<()> {
        let keys = self.unique_keys(&vertex);
        for key in &keys {
            if let Some(existing) = self.unique_index.get(key) {
                if existing != &vertex.guid {
                    return Err(GraphError::UniqueViolation {
                        type_name: key.type_name.clone(),
                        attr: key.attr_name.clone(),
                        existing: existing.clone(),
                    });
                }
            }
        }

        if let Some(previous) = self.vertices.remove(&vertex.guid) {
            self.unindex(&previous);
        }

        self.type_index.insert(&vertex.type_name, vertex.guid.clone());
        for key in keys {
            self.unique_index.insert(key, vertex.guid.clone());
        }
        self.vertices.insert(vertex.guid.clone(), vertex);
        Ok(())
    }

    fn remove_vertex(&mut self, guid: &Guid) -> GraphResult<Vertex> {
        let vertex = self
            .vertices
            .remove(guid)
            .ok_or_else(|| GraphError::VertexNotFound(guid.clone()))?;
        self.unindex(&vertex);
        Ok(vertex)
    }
}
