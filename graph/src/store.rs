//! Graph store accessor contract.

use crate::Vertex;
use std::collections::BTreeMap;
use strata_core::{Attributes, GraphError, GraphResult, Guid};

/// Primitive vertex access the mutation core is written against.
///
/// Implementors provide lookup, insert-or-replace and removal; the finder and
/// creation helpers are derived from those.
pub trait GraphStore {
    /// Get a vertex by GUID, in any state.
    fn get_vertex(&self, guid: &Guid) -> Option<&Vertex>;

    /// Find the vertex of `type_name` holding a unique attribute value.
    fn find_by_unique_attribute(
        &self,
        type_name: &str,
        attr_name: &str,
        value: &strata_core::Value,
    ) -> Option<&Vertex>;

    /// GUIDs of all vertices of a type, in any state.
    fn vertex_guids_of_type(&self, type_name: &str) -> Vec<Guid>;

    /// GUIDs of every vertex, in any state.
    fn all_vertex_guids(&self) -> Vec<Guid>;

    /// Insert or replace a vertex, maintaining indexes.
    fn put_vertex(&mut self, vertex: Vertex) -> GraphResult<()>;

    /// Remove a vertex, returning its last state.
    fn remove_vertex(&mut self, guid: &Guid) -> GraphResult<Vertex>;

    /// Find a vertex by GUID, in any state.
    fn find_by_guid(&self, guid: &Guid) -> Option<&Vertex> {
        self.get_vertex(guid)
    }

    /// Find a vertex by GUID only if it is soft-deleted.
    fn find_deleted_by_guid(&self, guid: &Guid) -> Option<&Vertex> {
        self.get_vertex(guid).filter(|v| v.is_deleted())
    }

    /// Find a vertex by its unique-attribute tuple. Any single indexed unique
    /// attribute identifies the vertex; attributes are tried in name order.
    fn find_by_unique_attributes(&self, type_name: &str, attrs: &Attributes) -> Option<&Vertex> {
        let sorted: BTreeMap<_, _> = attrs.iter().collect();
        sorted
            .into_iter()
            .find_map(|(name, value)| self.find_by_unique_attribute(type_name, name, value))
    }

    /// Create an empty vertex with a freshly generated GUID.
    fn create_vertex(&mut self, type_name: &str) -> GraphResult<Guid> {
        let guid = Guid::generate();
        self.create_vertex_with_guid(type_name, guid.clone())?;
        Ok(guid)
    }

    /// Create an empty vertex with a caller-supplied GUID.
    fn create_vertex_with_guid(&mut self, type_name: &str, guid: Guid) -> GraphResult<()> {
        if self.get_vertex(&guid).is_some() {
            return Err(GraphError::DuplicateGuid(guid));
        }
        self.put_vertex(Vertex::new(guid, type_name))
    }

    /// Apply a change to a vertex.
    fn update_vertex(
        &mut self,
        guid: &Guid,
        change: &mut dyn FnMut(&mut Vertex),
    ) -> GraphResult<()> {
        let mut vertex = self
            .get_vertex(guid)
            .cloned()
            .ok_or_else(|| GraphError::VertexNotFound(guid.clone()))?;
        change(&mut vertex);
        self.put_vertex(vertex)
    }
}
