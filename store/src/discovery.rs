//! Reference discovery and resolution.
//!
//! The discovery engine walks a batch, collects every entity reference it
//! holds, and resolves each one against persisted state. References that
//! stay unresolved are either batch-local (the entity is about to be
//! created) or point at entities outside the batch that are assumed to
//! exist.

use crate::{EntityStream, StoreError, StoreResult};
use std::collections::{BTreeSet, HashMap};
use strata_core::{ErrorCode, Guid, ObjectId, Value};
use strata_graph::GraphStore;
use strata_registry::Registry;
use tracing::debug;

/// Resolution of every reference in one batch.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    referenced_guids: Vec<Guid>,
    referenced_by_unique_attributes: Vec<ObjectId>,
    /// Referenced GUID to the GUID of the persisted vertex it resolved to.
    resolved_guids: HashMap<Guid, Guid>,
    /// Unique-attribute key to the GUID it resolved to; either persisted or
    /// the batch-local GUID of an entity in the same batch.
    resolved_by_unique_attributes: HashMap<String, Guid>,
    local_guid_references: BTreeSet<Guid>,
}

impl DiscoveryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_referenced_guid(&mut self, guid: Guid) {
        if !self.referenced_guids.contains(&guid) {
            self.referenced_guids.push(guid);
        }
    }

    pub fn add_referenced_by_unique_attributes(&mut self, id: ObjectId) {
        if !self.referenced_by_unique_attributes.contains(&id) {
            self.referenced_by_unique_attributes.push(id);
        }
    }

    /// Referenced GUIDs in discovery order.
    pub fn referenced_guids(&self) -> &[Guid] {
        &self.referenced_guids
    }

    pub fn referenced_by_unique_attributes(&self) -> &[ObjectId] {
        &self.referenced_by_unique_attributes
    }

    pub fn add_resolved_guid(&mut self, guid: Guid, vertex_guid: Guid) {
        self.resolved_guids.insert(guid, vertex_guid);
    }

    pub fn resolved_guid(&self, guid: &Guid) -> Option<&Guid> {
        self.resolved_guids.get(guid)
    }

    pub fn add_resolved_by_unique_attributes(&mut self, id: &ObjectId, guid: Guid) {
        if let Some(key) = id.unique_key() {
            self.resolved_by_unique_attributes.insert(key, guid);
        }
    }

    pub fn resolved_by_unique_attributes(&self, id: &ObjectId) -> Option<&Guid> {
        id.unique_key()
            .and_then(|key| self.resolved_by_unique_attributes.get(&key))
    }

    pub fn add_local_guid_reference(&mut self, guid: Guid) {
        self.local_guid_references.insert(guid);
    }

    /// References that did not resolve to a persisted vertex.
    pub fn local_guid_references(&self) -> &BTreeSet<Guid> {
        &self.local_guid_references
    }

    /// Final GUID of a reference, mapping batch-local GUIDs through
    /// `assignments` first and discovery results second.
    pub fn resolve_reference(
        &self,
        id: &ObjectId,
        assignments: &HashMap<Guid, Guid>,
    ) -> Option<Guid> {
        let guid = match id.guid.as_ref().filter(|g| !g.is_empty()) {
            Some(guid) => guid.clone(),
            None => self.resolved_by_unique_attributes(id)?.clone(),
        };
        if let Some(assigned) = assignments.get(&guid) {
            return Some(assigned.clone());
        }
        if let Some(resolved) = self.resolved_guids.get(&guid) {
            return Some(resolved.clone());
        }
        Some(guid)
    }

    /// Rewrite every resolvable reference inside `value` to reference by
    /// final GUID.
    pub fn resolve_value(&self, value: &Value, assignments: &HashMap<Guid, Guid>) -> Value {
        match value {
            Value::Ref(id) => match self.resolve_reference(id, assignments) {
                Some(guid) => Value::Ref(ObjectId::by_guid(guid, id.type_name.clone())),
                None => value.clone(),
            },
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|v| self.resolve_value(v, assignments))
                    .collect(),
            ),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v, assignments)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Walks a batch and resolves its references.
pub struct DiscoveryEngine<'a> {
    registry: &'a Registry,
    graph: &'a dyn GraphStore,
    is_import: bool,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(registry: &'a Registry, graph: &'a dyn GraphStore, is_import: bool) -> Self {
        Self {
            registry,
            graph,
            is_import,
        }
    }

    pub fn discover_and_resolve(&self, stream: &EntityStream) -> StoreResult<DiscoveryContext> {
        let mut context = DiscoveryContext::new();

        for entity in stream.iter() {
            if self.registry.entity_type(&entity.type_name).is_none() {
                return Err(StoreError::not_found(
                    ErrorCode::TypeNameInvalid,
                    entity.type_name.clone(),
                ));
            }
            context.add_referenced_guid(entity.guid.clone());

            for id in entity.referenced_ids() {
                match id.guid.as_ref().filter(|g| !g.is_empty()) {
                    Some(guid) => context.add_referenced_guid(guid.clone()),
                    None if !id.unique_attributes.is_empty() => {
                        context.add_referenced_by_unique_attributes(id.clone())
                    }
                    None => {}
                }
            }
        }

        self.resolve_guid_references(stream, &mut context)?;
        self.resolve_unique_attribute_references(stream, &mut context)?;

        debug!(
            referenced = context.referenced_guids.len(),
            resolved = context.resolved_guids.len(),
            local = context.local_guid_references.len(),
            "discovery complete"
        );
        Ok(context)
    }

    fn resolve_guid_references(
        &self,
        stream: &EntityStream,
        context: &mut DiscoveryContext,
    ) -> StoreResult<()> {
        let guids = context.referenced_guids.clone();
        for guid in guids {
            let assigned = guid.is_assigned();
            let mut vertex_guid = if assigned {
                self.graph.find_by_guid(&guid).map(|v| v.guid.clone())
            } else {
                None
            };

            if vertex_guid.is_none() && !self.is_import {
                match stream.get_by_guid(&guid) {
                    Some(entity) => {
                        vertex_guid = self
                            .graph
                            .find_by_unique_attributes(&entity.type_name, &entity.attributes)
                            .map(|v| v.guid.clone());
                    }
                    None if !assigned => {
                        return Err(StoreError::not_found(
                            ErrorCode::ReferencedEntityNotFound,
                            guid.to_string(),
                        ));
                    }
                    None => {}
                }
            }

            match vertex_guid {
                Some(vertex_guid) => context.add_resolved_guid(guid, vertex_guid),
                None => context.add_local_guid_reference(guid),
            }
        }
        Ok(())
    }

    fn resolve_unique_attribute_references(
        &self,
        stream: &EntityStream,
        context: &mut DiscoveryContext,
    ) -> StoreResult<()> {
        let ids = context.referenced_by_unique_attributes.clone();
        for id in ids {
            if self.registry.entity_type(&id.type_name).is_none() {
                return Err(StoreError::not_found(
                    ErrorCode::TypeNameInvalid,
                    id.type_name.clone(),
                ));
            }

            let persisted = self
                .graph
                .find_by_unique_attributes(&id.type_name, &id.unique_attributes)
                .map(|v| v.guid.clone());
            let resolved = persisted.or_else(|| self.find_in_stream(stream, &id));

            match resolved {
                Some(guid) => context.add_resolved_by_unique_attributes(&id, guid),
                None => {
                    return Err(StoreError::not_found(
                        ErrorCode::ReferencedEntityNotFound,
                        id.to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// A batch entity of the referenced type (or a subtype) carrying every
    /// unique attribute value of the reference.
    fn find_in_stream(&self, stream: &EntityStream, id: &ObjectId) -> Option<Guid> {
        stream
            .iter()
            .find(|e| {
                self.registry.is_entity_subtype(&e.type_name, &id.type_name)
                    && id
                        .unique_attributes
                        .iter()
                        .all(|(name, value)| e.attributes.get(name) == Some(value))
            })
            .map(|e| e.guid.clone())
    }
}
